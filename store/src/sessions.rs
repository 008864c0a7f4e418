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

//! Session blob storage and reporting queries

use crate::{Result, StoreError};
use fjall::{Keyspace, PartitionHandle, PersistMode};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Sequence key under which session ids are allocated.
const SESSION_SEQUENCE: &[u8] = b"sessions";

/// One persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBlob {
    /// Session id, monotonically allocated
    pub id: u64,
    /// Account the session belonged to
    pub username: String,
    /// Unix milliseconds at which the blob was recorded
    pub recorded_at_ms: u64,
    /// The accumulated, validated telemetry payload
    pub blob: Vec<u8>,
}

/// Per-user session count, as produced by [`SessionStore::report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSessions {
    /// Account name
    pub username: String,
    /// Number of sessions persisted for it
    pub sessions: u64,
}

/// Append-only storage of completed session blobs.
///
/// Values are framed as `len(username) | username | recorded_at_ms | blob`
/// with big-endian integers, keyed by the big-endian session id so an id
/// scan walks sessions in insertion order.
#[derive(Clone)]
pub struct SessionStore {
    keyspace: Keyspace,
    sessions: PartitionHandle,
    sequences: PartitionHandle,
}

impl SessionStore {
    pub(crate) fn new(
        keyspace: Keyspace,
        sessions: PartitionHandle,
        sequences: PartitionHandle,
    ) -> Self {
        Self {
            keyspace,
            sessions,
            sequences,
        }
    }

    /// Persist one completed session blob, returning its id.
    ///
    /// Ids come from a stored sequence counter. The single spool writer is
    /// the only caller on a live server, so the read-increment-write below
    /// needs no cross-process coordination.
    pub fn add_session(&self, username: &str, blob: Vec<u8>) -> Result<u64> {
        let id = self.next_session_id()?;
        let recorded_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);

        let name = username.as_bytes();
        let mut value = Vec::with_capacity(4 + name.len() + 8 + blob.len());
        value.extend_from_slice(&(name.len() as u32).to_be_bytes());
        value.extend_from_slice(name);
        value.extend_from_slice(&recorded_at_ms.to_be_bytes());
        value.extend_from_slice(&blob);

        self.sessions.insert(id.to_be_bytes(), value)?;
        self.keyspace.persist(PersistMode::SyncAll)?;

        debug!(username, id, bytes = blob.len(), "Persisted session blob");
        Ok(id)
    }

    /// Fetch one persisted session by id.
    pub fn export_session(&self, id: u64) -> Result<Option<SessionBlob>> {
        match self.sessions.get(id.to_be_bytes())? {
            Some(value) => Ok(Some(Self::decode(id, &value)?)),
            None => Ok(None),
        }
    }

    /// Ids of all sessions recorded for one account, in insertion order.
    pub fn user_sessions(&self, username: &str) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for entry in self.sessions.iter() {
            let (key, value) = entry?;
            let id = Self::decode_id(&key)?;
            let session = Self::decode(id, &value)?;
            if session.username == username {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Sessions per user, most active users first.
    pub fn report(&self) -> Result<Vec<UserSessions>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for entry in self.sessions.iter() {
            let (key, value) = entry?;
            let id = Self::decode_id(&key)?;
            let session = Self::decode(id, &value)?;
            *counts.entry(session.username).or_default() += 1;
        }

        let mut report: Vec<UserSessions> = counts
            .into_iter()
            .map(|(username, sessions)| UserSessions { username, sessions })
            .collect();
        report.sort_by(|a, b| b.sessions.cmp(&a.sessions).then(a.username.cmp(&b.username)));
        Ok(report)
    }

    /// Total number of persisted sessions.
    pub fn session_count(&self) -> Result<u64> {
        Ok(self.sessions.approximate_len() as u64)
    }

    fn next_session_id(&self) -> Result<u64> {
        let next = match self.sequences.get(SESSION_SEQUENCE)? {
            Some(raw) => Self::decode_id(&raw)? + 1,
            None => 1,
        };
        self.sequences.insert(SESSION_SEQUENCE, next.to_be_bytes())?;
        Ok(next)
    }

    fn decode_id(raw: &[u8]) -> Result<u64> {
        let bytes: [u8; 8] = raw.try_into().map_err(|_| StoreError::CorruptRecord(0))?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn decode(id: u64, value: &[u8]) -> Result<SessionBlob> {
        let corrupt = || StoreError::CorruptRecord(id);

        let name_len =
            u32::from_be_bytes(value.get(..4).ok_or_else(corrupt)?.try_into().unwrap()) as usize;
        let name = value.get(4..4 + name_len).ok_or_else(corrupt)?;
        let ts_end = 4 + name_len + 8;
        let recorded_at_ms = u64::from_be_bytes(
            value
                .get(4 + name_len..ts_end)
                .ok_or_else(corrupt)?
                .try_into()
                .unwrap(),
        );
        let blob = value.get(ts_end..).ok_or_else(corrupt)?.to_vec();

        Ok(SessionBlob {
            id,
            username: String::from_utf8_lossy(name).into_owned(),
            recorded_at_ms,
            blob,
        })
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::TelemetryStore;

    const SESSION: &[u8] = b"1678134985526;8;1\n1678134985539;1;0\n1678134985560;2;1\n";

    #[test]
    fn test_add_and_export_session() {
        let (store, _) = TelemetryStore::open_temporary().unwrap();
        let sessions = store.sessions();

        let id = sessions.add_session("user", SESSION.to_vec()).unwrap();
        let exported = sessions.export_session(id).unwrap().unwrap();

        assert_eq!(exported.username, "user");
        assert_eq!(exported.blob, SESSION);
        assert!(exported.recorded_at_ms > 0);

        assert!(sessions.export_session(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_session_ids_are_monotonic() {
        let (store, _) = TelemetryStore::open_temporary().unwrap();
        let sessions = store.sessions();

        let first = sessions.add_session("user", b"1;2;3\n".to_vec()).unwrap();
        let second = sessions.add_session("user", b"4;5;6\n".to_vec()).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_user_sessions() {
        let (store, _) = TelemetryStore::open_temporary().unwrap();
        let sessions = store.sessions();

        let a = sessions.add_session("alice", b"1;2;3\n".to_vec()).unwrap();
        let _ = sessions.add_session("bob", b"4;5;6\n".to_vec()).unwrap();
        let b = sessions.add_session("alice", b"7;8;9\n".to_vec()).unwrap();

        assert_eq!(sessions.user_sessions("alice").unwrap(), vec![a, b]);
        assert_eq!(sessions.user_sessions("nobody").unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn test_report_orders_by_activity() {
        let (store, _) = TelemetryStore::open_temporary().unwrap();
        let sessions = store.sessions();

        for _ in 0..3 {
            sessions.add_session("busy", b"1;2;3\n".to_vec()).unwrap();
        }
        sessions.add_session("quiet", b"1;2;3\n".to_vec()).unwrap();

        let report = sessions.report().unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].username, "busy");
        assert_eq!(report[0].sessions, 3);
        assert_eq!(report[1].username, "quiet");
        assert_eq!(report[1].sessions, 1);
    }
}
