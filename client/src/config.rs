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

//! Client configuration

use std::time::Duration;

/// Telemetry client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Account name sent in the greeting
    pub username: String,

    /// Clear-text password sent in the greeting
    pub password: String,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Heartbeat window: a probe is sent when this long passes without contact
    pub heartbeat_timeout: Duration,

    /// Unanswered probes tolerated before the session is declared dead
    pub probe_tolerance: u32,

    /// Optional delay between records, simulating a paced telemetry source
    pub pace: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 10227,
            username: "user".to_string(),
            password: "password".to_string(),
            connect_timeout: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(1),
            probe_tolerance: 3,
            pace: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given server and account
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the heartbeat window
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Set the number of unanswered probes tolerated
    pub fn with_probe_tolerance(mut self, tolerance: u32) -> Self {
        self.probe_tolerance = tolerance;
        self
    }

    /// Set the delay between records
    pub fn with_pace(mut self, pace: Option<Duration>) -> Self {
        self.pace = pace;
        self
    }

    /// Get the server address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address() {
        let config = ClientConfig::new("example.com", 10227, "user", "pw");
        assert_eq!(config.address(), "example.com:10227");
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_heartbeat_timeout(Duration::from_millis(10))
            .with_probe_tolerance(5)
            .with_pace(Some(Duration::from_millis(2)));

        assert_eq!(config.heartbeat_timeout, Duration::from_millis(10));
        assert_eq!(config.probe_tolerance, 5);
        assert_eq!(config.pace, Some(Duration::from_millis(2)));
    }
}
