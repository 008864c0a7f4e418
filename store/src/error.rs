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

//! Error types for the durable store

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// Error surfaced by the embedded storage engine
    #[error("storage engine error: {0}")]
    Engine(#[from] fjall::Error),

    /// Password hashing or verification failed
    #[error("password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// I/O error creating or accessing the store directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored session record could not be decoded
    #[error("corrupt session record {0}")]
    CorruptRecord(u64),
}
