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

//! Frame types for the telemetry line protocol

use crate::{ACCEPT, FINISHED, KEEP_ALIVE};

/// A single frame of the line protocol.
///
/// Decoding only ever produces [`Frame::Accept`], [`Frame::KeepAlive`],
/// [`Frame::Finished`] and [`Frame::Line`]; a greeting looks like any other
/// text line on the wire and is recognized by the server with
/// [`Frame::parse_greeting`] while the session is authenticating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Authentication greeting, `<username>:<password>`.
    Greeting {
        /// Account name
        username: String,
        /// Clear-text password, hashed and verified server-side
        password: String,
    },
    /// Authentication accepted, wire code `200`.
    Accept,
    /// Liveness probe or its echo, wire code `100`.
    KeepAlive,
    /// Voluntary end of session, wire code `500`.
    Finished,
    /// Any other line: a telemetry record, or noise that still counts as one.
    Line(String),
}

impl Frame {
    /// Build a greeting frame.
    pub fn greeting(username: impl Into<String>, password: impl Into<String>) -> Self {
        Frame::Greeting {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse a received line as an authentication greeting.
    ///
    /// A greeting is exactly two `:`-separated fields. Returns `None` for
    /// anything else, which the server treats as a malformed greeting and
    /// rejects.
    pub fn parse_greeting(line: &str) -> Option<(String, String)> {
        let mut parts = line.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(username), Some(password), None) => {
                Some((username.to_string(), password.to_string()))
            }
            _ => None,
        }
    }

    /// Render the frame as its wire line, without the terminator.
    pub fn as_line(&self) -> String {
        match self {
            Frame::Greeting { username, password } => format!("{username}:{password}"),
            Frame::Accept => ACCEPT.to_string(),
            Frame::KeepAlive => KEEP_ALIVE.to_string(),
            Frame::Finished => FINISHED.to_string(),
            Frame::Line(line) => line.clone(),
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Never echo credentials into logs
            Frame::Greeting { username, .. } => write!(f, "greeting({username})"),
            Frame::Accept => write!(f, "accept"),
            Frame::KeepAlive => write!(f, "keep-alive"),
            Frame::Finished => write!(f, "finished"),
            Frame::Line(line) => write!(f, "line({} bytes)", line.len()),
        }
    }
}

/// Check a record line for the telemetry shape: exactly three `;`-separated
/// fields, `timestamp;code;value`.
///
/// Only the shape is checked. Records failing it are counted by the server
/// but never stored.
pub fn is_well_formed(line: &str) -> bool {
    line.split(';').count() == 3
}
