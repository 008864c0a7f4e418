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

//! Client error types

use std::fmt;
use std::io;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error type
///
/// Session-level outcomes (rejection, refusal, liveness loss) are not errors;
/// they are reported in the driver's `SessionReport`. Errors here mean the
/// driver itself could not do its job.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// I/O error
    Io(String),

    /// Connection timeout
    ConnectionTimeout,

    /// Framing error
    Codec(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(message) => write!(f, "I/O error: {message}"),
            ClientError::ConnectionTimeout => write!(f, "connection timed out"),
            ClientError::Codec(message) => write!(f, "framing error: {message}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<io::Error> for ClientError {
    fn from(error: io::Error) -> Self {
        ClientError::Io(error.to_string())
    }
}

impl From<telemetrix_linecodec::CodecError> for ClientError {
    fn from(error: telemetrix_linecodec::CodecError) -> Self {
        ClientError::Codec(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ClientError::ConnectionTimeout.to_string(),
            "connection timed out"
        );
        assert_eq!(
            ClientError::Io("broken pipe".to_string()).to_string(),
            "I/O error: broken pipe"
        );
    }
}
