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

//! Error types for the telemetry server

use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Telemetry server error types
#[derive(Debug, Error)]
pub enum ServerError {
    /// I/O error from the underlying TCP stream or listener
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error from the codec layer
    #[error("protocol error: {0}")]
    Codec(#[from] telemetrix_linecodec::CodecError),

    /// Error from the durable store
    #[error("store error: {0}")]
    Store(#[from] telemetrix_store::StoreError),

    /// Server is not running
    #[error("server not running")]
    ServerNotRunning,

    /// Server is already running
    #[error("server already running")]
    AlreadyRunning,
}

impl ServerError {
    /// Check if the error only ends one session rather than the server.
    ///
    /// Transport and framing failures terminate the session they happened on;
    /// they are never fatal to the process.
    pub fn is_session_error(&self) -> bool {
        matches!(self, ServerError::Io(_) | ServerError::Codec(_))
    }
}
