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

//! Online-user registry
//!
//! One instance is shared by every session worker for the lifetime of the
//! server process. It is handed to workers explicitly at construction; there
//! is no process-wide singleton. Nothing is persisted: a restarted server
//! starts with an empty registry.

use crate::SessionId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Concurrent set of currently authenticated usernames.
///
/// The duplicate-login rule lives here: `try_login` is a single atomic
/// check-and-insert, so two racing connections with the same username can
/// never both pass.
#[derive(Debug, Default)]
pub struct OnlineRegistry {
    users: DashMap<String, SessionId>,
}

impl OnlineRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a username for a session.
    ///
    /// Returns `false` without touching the registry when the username is
    /// already online.
    pub fn try_login(&self, username: &str, session: SessionId) -> bool {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(session);
                true
            }
        }
    }

    /// Release a username. Idempotent: releasing an absent name is a no-op.
    pub fn logout(&self, username: &str) {
        self.users.remove(username);
    }

    /// Check whether a username currently holds a session
    pub fn is_online(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Number of usernames currently online
    pub fn count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_login_claims_once() {
        let registry = OnlineRegistry::new();

        assert!(registry.try_login("bob", SessionId::new(1)));
        assert!(!registry.try_login("bob", SessionId::new(2)));
        assert!(registry.is_online("bob"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_logout_is_idempotent() {
        let registry = OnlineRegistry::new();

        registry.try_login("bob", SessionId::new(1));
        registry.logout("bob");
        registry.logout("bob");

        assert!(!registry.is_online("bob"));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_relogin_after_logout() {
        let registry = OnlineRegistry::new();

        assert!(registry.try_login("bob", SessionId::new(1)));
        registry.logout("bob");
        assert!(registry.try_login("bob", SessionId::new(2)));
    }

    #[test]
    fn test_concurrent_login_race() {
        use std::sync::Arc;

        let registry = Arc::new(OnlineRegistry::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                registry.try_login("bob", SessionId::new(i))
            }));
        }

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(registry.is_online("bob"));
    }
}
