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

use crate::{CredentialStore, Result, SessionStore};
use fjall::{Config, Keyspace, PartitionCreateOptions};
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

/// The durable keyspace holding credentials and session blobs.
///
/// Cheap to clone internally: the partition handles are reference counted and
/// the store is safely shared across tasks behind an `Arc`.
pub struct TelemetryStore {
    credentials: CredentialStore,
    sessions: SessionStore,

    /// If this is a temporary store, the backing directory is removed when
    /// the store is dropped.
    _tmpdir: Option<TempDir>,
}

impl TelemetryStore {
    /// Open (or create) a store at `path`.
    ///
    /// Returns the store and a flag telling whether the keyspace was freshly
    /// created. A fresh store is seeded with the demo accounts
    /// `user:password` and `test:dummy`.
    pub fn open(path: &Path) -> Result<(Self, bool)> {
        Self::open_inner(path, None)
    }

    /// Open a throwaway store in a temporary directory, cleaned up on drop.
    ///
    /// Intended for tests and local experiments.
    pub fn open_temporary() -> Result<(Self, bool)> {
        let tmpdir = TempDir::new()?;
        let path = tmpdir.path().to_path_buf();
        Self::open_inner(&path, Some(tmpdir))
    }

    fn open_inner(path: &Path, tmpdir: Option<TempDir>) -> Result<(Self, bool)> {
        let keyspace = Config::new(path).open()?;

        // A keyspace that existed before already carries all partitions;
        // anything else is treated as freshly provisioned.
        let fresh = keyspace.partition_count() < 3;

        let users = keyspace.open_partition("users", PartitionCreateOptions::default())?;
        let sessions = keyspace.open_partition("sessions", PartitionCreateOptions::default())?;
        let sequences = keyspace.open_partition("sequences", PartitionCreateOptions::default())?;

        let credentials = CredentialStore::new(keyspace.clone(), users);
        let sessions = SessionStore::new(keyspace, sessions, sequences);

        if fresh {
            info!(path = %path.display(), "Provisioning fresh telemetry store");
            credentials.add_user("user", "password")?;
            credentials.add_user("test", "dummy")?;
        }

        Ok((
            Self {
                credentials,
                sessions,
                _tmpdir: tmpdir,
            },
            fresh,
        ))
    }

    /// Credential lookup and provisioning.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Session blob storage and reporting.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

impl std::fmt::Debug for TelemetryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryStore")
            .field("temporary", &self._tmpdir.is_some())
            .finish()
    }
}
