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

//! Core types for the telemetry ingest server

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Unique identifier for a session (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Session protocol phase.
///
/// The single place transitions are defined; everything else asks
/// [`SessionPhase::can_transition_to`] instead of flipping booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the greeting line
    Authenticating,
    /// Authenticated, accepting records and heartbeats
    Streaming,
    /// Ended voluntarily or by disconnect (terminal)
    Finished,
    /// Authentication failed (terminal)
    Rejected,
}

impl SessionPhase {
    /// Check whether a transition is part of the protocol state machine
    pub fn can_transition_to(self, next: SessionPhase) -> bool {
        matches!(
            (self, next),
            (SessionPhase::Authenticating, SessionPhase::Streaming)
                | (SessionPhase::Authenticating, SessionPhase::Rejected)
                | (SessionPhase::Streaming, SessionPhase::Finished)
        )
    }

    /// Check if the phase is terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Finished | SessionPhase::Rejected)
    }

    /// Check if the session reached authentication
    pub fn is_authenticated(self) -> bool {
        matches!(self, SessionPhase::Streaming | SessionPhase::Finished)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticating => write!(f, "authenticating"),
            Self::Streaming => write!(f, "streaming"),
            Self::Finished => write!(f, "finished"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Why a session was turned away during authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The greeting was not exactly `user:password`
    MalformedGreeting,
    /// The username already has an open authenticated session
    AlreadyOnline,
    /// Unknown username or wrong password
    BadCredentials,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedGreeting => write!(f, "malformed greeting"),
            Self::AlreadyOnline => write!(f, "already logged in"),
            Self::BadCredentials => write!(f, "invalid username or password"),
        }
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Number of sessions currently being served
    pub active_sessions: usize,
    /// Total sessions since server start
    pub total_sessions: u64,
    /// Number of authenticated usernames online
    pub users_online: usize,
    /// Server bind address
    pub bind_address: SocketAddr,
    /// Server uptime
    pub uptime: Duration,
    /// Server start time
    pub started_at: Instant,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TelemetryServer {{ active: {}, total: {}, online: {}, addr: {}, uptime: {:?} }}",
            self.active_sessions, self.total_sessions, self.users_online, self.bind_address, self.uptime
        )
    }
}
