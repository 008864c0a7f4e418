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

//! Credential records and password verification

use crate::Result;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use tracing::debug;

/// One provisioned account.
///
/// The hash is a bcrypt string and carries its own salt; records are created
/// once at provisioning and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Unique account name
    pub username: String,
    /// bcrypt password hash
    pub password_hash: String,
}

/// Lookup and provisioning of account credentials.
#[derive(Clone)]
pub struct CredentialStore {
    keyspace: Keyspace,
    users: PartitionHandle,
}

impl CredentialStore {
    pub(crate) fn new(keyspace: Keyspace, users: PartitionHandle) -> Self {
        Self { keyspace, users }
    }

    /// Provision an account with a bcrypt-hashed password.
    ///
    /// A username that already exists is left untouched, so re-provisioning
    /// a known account is harmless.
    pub fn add_user(&self, username: &str, password: &str) -> Result<()> {
        if self.users.get(username.as_bytes())?.is_some() {
            debug!(username, "User already provisioned, keeping existing hash");
            return Ok(());
        }

        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        self.users.insert(username.as_bytes(), hash.as_bytes())?;
        self.keyspace.persist(PersistMode::SyncAll)?;

        debug!(username, "Provisioned user");
        Ok(())
    }

    /// Look up an account by name.
    pub fn get_user(&self, username: &str) -> Result<Option<CredentialRecord>> {
        let record = self.users.get(username.as_bytes())?.map(|hash| CredentialRecord {
            username: username.to_string(),
            password_hash: String::from_utf8_lossy(&hash).into_owned(),
        });
        Ok(record)
    }

    /// Verify a clear-text password against the stored hash.
    ///
    /// Unknown usernames verify as `false`; only engine failures surface as
    /// errors.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool> {
        match self.get_user(username)? {
            Some(record) => Ok(bcrypt::verify(password, &record.password_hash).unwrap_or(false)),
            None => Ok(false),
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::TelemetryStore;

    #[test]
    fn test_add_and_get_user() {
        let (store, _) = TelemetryStore::open_temporary().unwrap();
        let credentials = store.credentials();

        credentials.add_user("alice", "pw").unwrap();
        let record = credentials.get_user("alice").unwrap().unwrap();
        assert_eq!(record.username, "alice");
        assert!(record.password_hash.starts_with("$2"));

        assert!(credentials.get_user("bob").unwrap().is_none());
    }

    #[test]
    fn test_add_user_keeps_existing_hash() {
        let (store, _) = TelemetryStore::open_temporary().unwrap();
        let credentials = store.credentials();

        credentials.add_user("alice", "first").unwrap();
        let original = credentials.get_user("alice").unwrap().unwrap();

        credentials.add_user("alice", "second").unwrap();
        let unchanged = credentials.get_user("alice").unwrap().unwrap();

        assert_eq!(original, unchanged);
        assert!(credentials.verify("alice", "first").unwrap());
        assert!(!credentials.verify("alice", "second").unwrap());
    }

    #[test]
    fn test_verify() {
        let (store, _) = TelemetryStore::open_temporary().unwrap();
        let credentials = store.credentials();

        credentials.add_user("alice", "pw").unwrap();
        assert!(credentials.verify("alice", "pw").unwrap());
        assert!(!credentials.verify("alice", "wrong").unwrap());
        assert!(!credentials.verify("nobody", "pw").unwrap());
    }
}
