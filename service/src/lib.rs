//
// Copyright 2017-2025 Hans W. Uhlig. All Rights Reserved.
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

//! Telemetry Ingest Service
//!
//! An async-first TCP server ingesting telemetry events over the line
//! protocol defined in `telemetrix-linecodec`:
//!
//! - One worker task per accepted connection, no cross-session sharing of
//!   session state
//! - Duplicate logins refused through a single atomic registry claim
//! - Completed session blobs handed to a spool and persisted off the
//!   connection path
//! - Guaranteed registry cleanup on every session exit path
//! - Lock-free metrics and monitoring
//!
//! # Architecture
//!
//! ```text
//! TelemetryServer
//!     ↓ accept
//! SessionWorker → Session
//!     ↓ on close            ↘ shared
//! SessionSpool → TelemetryStore   OnlineRegistry
//! ```
//!
//! # Example
//!
//! ```no_run
//! use telemetrix_service::{ServerConfig, TelemetryServer};
//! use telemetrix_store::TelemetryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (store, _) = TelemetryStore::open_temporary()?;
//!     let server = TelemetryServer::bind(ServerConfig::default(), Arc::new(store)).await?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod metrics;
mod registry;
mod server;
mod session;
mod spool;
mod types;
mod worker;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::{Result, ServerError};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::OnlineRegistry;
pub use server::TelemetryServer;
pub use session::Session;
pub use spool::{SessionSpool, SpoolEntry};
pub use types::{RejectReason, ServerSnapshot, SessionId, SessionPhase};
pub use worker::SessionWorker;
