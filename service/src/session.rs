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

//! Per-connection session state
//!
//! A [`Session`] is exclusively owned by the worker task serving its
//! connection. No other session can ever observe or touch it; the only state
//! shared across connections lives in the registry and the spool.

use crate::spool::SpoolEntry;
use crate::{SessionId, SessionPhase};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use telemetrix_linecodec::is_well_formed;
use tracing::warn;

/// State of one accepted connection, from greeting to close.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer_addr: SocketAddr,
    username: Option<String>,
    phase: SessionPhase,
    received: u64,
    blob: Vec<u8>,
    started_at: Instant,
    last_contact: Instant,
}

impl Session {
    /// Create a session for a freshly accepted connection
    pub fn new(id: SessionId, peer_addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer_addr,
            username: None,
            phase: SessionPhase::Authenticating,
            received: 0,
            blob: Vec::new(),
            started_at: now,
            last_contact: now,
        }
    }

    /// Move to the next phase, enforcing the state machine centrally.
    ///
    /// An illegal transition is logged and ignored; callers drive the
    /// protocol and never legitimately request one.
    pub fn advance(&mut self, next: SessionPhase) {
        if self.phase.can_transition_to(next) {
            self.phase = next;
        } else {
            warn!(
                session_id = %self.id,
                from = %self.phase,
                to = %next,
                "Ignoring illegal session phase transition"
            );
        }
    }

    /// Mark the session authenticated as `username` and enter streaming
    pub fn authenticate(&mut self, username: String) {
        self.username = Some(username);
        self.advance(SessionPhase::Streaming);
    }

    /// Mark the session rejected
    pub fn reject(&mut self) {
        self.advance(SessionPhase::Rejected);
    }

    /// Mark the session voluntarily finished
    pub fn finish(&mut self) {
        self.advance(SessionPhase::Finished);
    }

    /// Count one incoming record line, keeping it only if well formed.
    ///
    /// Returns whether the line was appended to the blob.
    pub fn absorb(&mut self, line: &str) -> bool {
        self.received += 1;
        let stored = is_well_formed(line);
        if stored {
            self.blob.extend_from_slice(line.as_bytes());
            self.blob.push(b'\n');
        }
        stored
    }

    /// Refresh the heartbeat contact timestamp
    pub fn touch(&mut self) {
        self.last_contact = Instant::now();
    }

    /// Session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Peer address of the connection
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Authenticated username, if authentication succeeded
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Current protocol phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of record lines received, valid or not
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Size of the accumulated blob in bytes
    pub fn blob_len(&self) -> usize {
        self.blob.len()
    }

    /// Time since the session was accepted
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time since the last heartbeat contact
    pub fn idle(&self) -> Duration {
        self.last_contact.elapsed()
    }

    /// Hand the session payload off for persistence.
    ///
    /// Only sessions that authenticated and received at least one record
    /// produce an entry; the blob is moved out, not copied.
    pub fn into_spool_entry(self) -> Option<SpoolEntry> {
        if !self.phase.is_authenticated() || self.received == 0 {
            return None;
        }
        let username = self.username?;
        Some(SpoolEntry {
            username,
            events: self.received,
            blob: self.blob,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SessionId::new(1), "127.0.0.1:40000".parse().unwrap())
    }

    #[test]
    fn test_absorb_counts_and_filters() {
        let mut session = session();

        assert!(session.absorb("1678134985526;8;1"));
        assert!(session.absorb("1678134985539;1;0.5"));
        assert!(!session.absorb("not a record"));
        assert!(!session.absorb(""));

        assert_eq!(session.received(), 4);
        assert_eq!(
            session.blob_len(),
            "1678134985526;8;1\n1678134985539;1;0.5\n".len()
        );
    }

    #[test]
    fn test_spool_entry_requires_authentication() {
        let mut session = session();
        session.absorb("1;2;3");
        assert!(session.into_spool_entry().is_none());
    }

    #[test]
    fn test_spool_entry_requires_records() {
        let mut session = session();
        session.authenticate("alice".to_string());
        session.finish();
        assert!(session.into_spool_entry().is_none());
    }

    #[test]
    fn test_spool_entry_moves_blob() {
        let mut session = session();
        session.authenticate("alice".to_string());
        session.absorb("1;2;3");
        session.absorb("junk");
        session.finish();

        let entry = session.into_spool_entry().unwrap();
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.events, 2);
        assert_eq!(entry.blob, b"1;2;3\n");
    }

    #[test]
    fn test_rejected_session_never_spools() {
        let mut session = session();
        session.absorb("1;2;3");
        session.reject();
        assert!(session.into_spool_entry().is_none());
    }

    #[test]
    fn test_touch_refreshes_contact() {
        let mut session = session();
        std::thread::sleep(Duration::from_millis(5));
        assert!(session.idle() >= Duration::from_millis(5));

        session.touch();
        assert!(session.idle() < Duration::from_millis(5));
    }

    #[test]
    fn test_illegal_transition_is_ignored() {
        let mut session = session();
        session.reject();
        assert_eq!(session.phase(), SessionPhase::Rejected);

        // a rejected session cannot be revived
        session.authenticate("alice".to_string());
        assert_eq!(session.phase(), SessionPhase::Rejected);
    }
}
