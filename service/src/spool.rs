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

//! Persistence spool
//!
//! The producer-consumer handoff between session workers and the durable
//! store. Producers enqueue without blocking and without touching storage;
//! a single writer task drains the queue, blocking while it is empty, and
//! performs the store writes. Ordering across sessions is not promised.
//!
//! A blob that fails to persist is logged and dropped. Delivery is
//! at-most-once by design; there is no retry or dead-letter path.

use crate::ServerMetrics;
use std::sync::Arc;
use telemetrix_store::TelemetryStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One completed session payload awaiting persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolEntry {
    /// Account the session belonged to
    pub username: String,
    /// Record lines received during the session, valid or not
    pub events: u64,
    /// The accumulated validated payload
    pub blob: Vec<u8>,
}

/// Handle used by session workers to enqueue completed sessions.
///
/// Cloned into every worker; the writer task ends once every clone is gone
/// and the queue has drained.
#[derive(Debug, Clone)]
pub struct SessionSpool {
    tx: mpsc::UnboundedSender<SpoolEntry>,
}

impl SessionSpool {
    /// Start the spool writer, returning the producer handle and the writer
    /// task handle for shutdown joining.
    pub fn start(
        store: Arc<TelemetryStore>,
        metrics: Arc<ServerMetrics>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(rx, store, metrics));
        (Self { tx }, writer)
    }

    /// Hand a completed session to the writer.
    ///
    /// Never blocks and never performs I/O. If the writer is gone (server
    /// tearing down) the entry is dropped with a warning.
    pub fn enqueue(&self, entry: SpoolEntry) {
        let username = entry.username.clone();
        if self.tx.send(entry).is_err() {
            warn!(username = %username, "Spool writer gone, dropping session blob");
        }
    }
}

async fn write_loop(
    mut rx: mpsc::UnboundedReceiver<SpoolEntry>,
    store: Arc<TelemetryStore>,
    metrics: Arc<ServerMetrics>,
) {
    while let Some(entry) = rx.recv().await {
        match store.sessions().add_session(&entry.username, entry.blob) {
            Ok(id) => {
                metrics.session_persisted();
                info!(
                    username = %entry.username,
                    session_blob = id,
                    events = entry.events,
                    "Saved session blob"
                );
            }
            Err(error) => {
                // At-most-once: the blob is gone after this line.
                metrics.persist_failed();
                error!(
                    username = %entry.username,
                    events = entry.events,
                    %error,
                    "Failed to persist session blob, dropping it"
                );
            }
        }
    }
    info!("Spool writer drained and stopped");
}
