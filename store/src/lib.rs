//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! # Telemetrix Store
//!
//! Durable storage for the telemetry server, backed by an embedded
//! log-structured keyspace. Two collaborators live here:
//!
//! - [`CredentialStore`]: salted password hashes by username, written once at
//!   provisioning and looked up on every authentication.
//! - [`SessionStore`]: completed session blobs, appended under a monotonic
//!   sequence with a recording timestamp, plus the reporting queries built on
//!   top of them.
//!
//! Both views share one [`TelemetryStore`] keyspace. A store opened on a path
//! that did not exist before is seeded with the demo accounts `user:password`
//! and `test:dummy` so a freshly provisioned server is immediately usable.
//!
//! ```no_run
//! use telemetrix_store::TelemetryStore;
//!
//! # fn example() -> Result<(), telemetrix_store::StoreError> {
//! let (store, fresh) = TelemetryStore::open(std::path::Path::new("./telemetry.db"))?;
//! if fresh {
//!     store.credentials().add_user("alice", "pw")?;
//! }
//! store.sessions().add_session("alice", b"1678134985526;8;1\n".to_vec())?;
//! # Ok(())
//! # }
//! ```

mod credentials;
mod error;
mod sessions;
mod store;

pub use credentials::{CredentialRecord, CredentialStore};
pub use error::{Result, StoreError};
pub use sessions::{SessionBlob, SessionStore, UserSessions};
pub use store::TelemetryStore;
