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

//! # Telemetrix Client
//!
//! Session driver for the telemetry line protocol: connect, authenticate,
//! stream records, and keep the session alive with a bidirectional heartbeat.
//!
//! ## Features
//!
//! - **Single-attempt sessions** - A refused connection is reported, never
//!   retried
//! - **Tolerant liveness** - Probes ride a sliding counter; a configurable
//!   number of unanswered probes is allowed before the session is declared
//!   dead
//! - **Lazy feeds** - Records come from any finite iterator of record lines;
//!   a randomized [`SyntheticFeed`] ships for load and demo traffic
//! - **Async-First** - Built on Tokio, one driver task plus two heartbeat
//!   tasks per session
//!
//! ## Quick Start
//!
//! ```no_run
//! use telemetrix_client::{ClientConfig, SessionDriver, SyntheticFeed};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("localhost", 10227, "user", "password");
//!     let driver = SessionDriver::new(config);
//!
//!     let report = driver.run(SyntheticFeed::new(30)).await?;
//!     println!("{report}");
//!
//!     Ok(())
//! }
//! ```

mod config;
mod driver;
mod error;
mod feed;
mod liveness;

pub use config::ClientConfig;
pub use driver::{Outcome, SessionDriver, SessionReport};
pub use error::{ClientError, Result};
pub use feed::SyntheticFeed;
pub use liveness::Liveness;
