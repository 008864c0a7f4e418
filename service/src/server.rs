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

//! Telemetry server implementation
//!
//! The TelemetryServer is the main entry point of the ingest service. It
//! manages the TCP listener, accepts connections, and spawns one
//! [`crate::SessionWorker`] per connection. The online-user registry and the
//! persistence spool are created here and injected into every worker.

use crate::spool::SessionSpool;
use crate::{
    OnlineRegistry, Result, ServerConfig, ServerError, ServerMetrics, ServerSnapshot, SessionId,
    SessionWorker,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use telemetrix_store::TelemetryStore;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Telemetry ingest server
///
/// # Example
///
/// ```no_run
/// use telemetrix_service::{ServerConfig, TelemetryServer};
/// use telemetrix_store::TelemetryStore;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (store, _) = TelemetryStore::open(std::path::Path::new("./telemetry.db"))?;
///     let config = ServerConfig::default();
///
///     let server = TelemetryServer::bind(config, Arc::new(store)).await?;
///     server.start().await?;
///
///     // Server is now running, wait for a shutdown signal
///     // tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///
///     Ok(())
/// }
/// ```
pub struct TelemetryServer {
    /// Server configuration
    config: ServerConfig,
    /// Online-user registry shared by all workers
    registry: Arc<OnlineRegistry>,
    /// Durable store
    store: Arc<TelemetryStore>,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Spool producer handle; taken and dropped on shutdown to drain the writer
    spool: tokio::sync::Mutex<Option<SessionSpool>>,
    /// Spool writer task handle
    spool_writer: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    /// TCP listener (wrapped for sharing with the accept loop)
    listener: Arc<tokio::sync::Mutex<TcpListener>>,
    /// Actual bind address
    bind_address: SocketAddr,
    /// Server start time
    started_at: Instant,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Shutdown notification
    shutdown_notify: Arc<Notify>,
    /// Accept loop task handle
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    /// Next session id (monotonically increasing)
    next_id: Arc<AtomicU64>,
}

impl TelemetryServer {
    /// Bind the listener and start the spool writer.
    ///
    /// A port that is already bound surfaces here as an I/O error before the
    /// server serves anything; callers treat that as fatal at startup.
    /// Call `start()` to begin accepting connections.
    pub async fn bind(config: ServerConfig, store: Arc<TelemetryStore>) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_address).await?;
        let actual_addr = listener.local_addr()?;

        let metrics = Arc::new(ServerMetrics::new());
        let registry = Arc::new(OnlineRegistry::new());
        let (spool, spool_writer) = SessionSpool::start(store.clone(), metrics.clone());

        info!("Telemetry server bound to {}", actual_addr);

        Ok(Self {
            config,
            registry,
            store,
            metrics,
            spool: tokio::sync::Mutex::new(Some(spool)),
            spool_writer: tokio::sync::Mutex::new(Some(spool_writer)),
            listener: Arc::new(tokio::sync::Mutex::new(listener)),
            bind_address: actual_addr,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: tokio::sync::Mutex::new(None),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Start accepting connections.
    ///
    /// Spawns the accept loop; the server runs until `shutdown()` is called.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        info!("Starting telemetry server on {}", self.bind_address);

        let handle = self.spawn_accept_loop().await?;
        *self.accept_handle.lock().await = Some(handle);

        Ok(())
    }

    /// Spawn the accept loop task
    async fn spawn_accept_loop(&self) -> Result<JoinHandle<()>> {
        let listener = self.listener.clone();
        let registry = self.registry.clone();
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let config = self.config.clone();
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();
        let next_id = self.next_id.clone();
        let spool = self
            .spool
            .lock()
            .await
            .clone()
            .ok_or(ServerError::ServerNotRunning)?;

        Ok(tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let accept_result = tokio::select! {
                    result = async {
                        listener.lock().await.accept().await
                    } => result,
                    _ = shutdown_notify.notified() => break,
                };

                match accept_result {
                    Ok((socket, peer_addr)) => {
                        if metrics.active_sessions() as usize >= config.max_connections {
                            warn!(
                                "Connection limit reached ({}), rejecting connection from {}",
                                config.max_connections, peer_addr
                            );
                            drop(socket);
                            continue;
                        }

                        let id = SessionId::new(next_id.fetch_add(1, Ordering::SeqCst));
                        info!("Session {} accepted from {}", id, peer_addr);

                        let worker = SessionWorker::new(
                            id,
                            socket,
                            peer_addr,
                            config.max_line_length,
                            registry.clone(),
                            spool.clone(),
                            store.clone(),
                            metrics.clone(),
                        );
                        tokio::spawn(worker.run());
                    }
                    Err(error) => {
                        warn!(%error, "Failed to accept connection");
                        // Back off on errors to avoid a tight loop
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }

            info!("Accept loop terminated");
        }))
    }

    /// Shutdown the server gracefully.
    ///
    /// Stops accepting new connections and waits (up to the configured
    /// timeout) for the accept loop and the spool writer. Sessions still in
    /// flight keep their workers until their sockets close.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServerError::ServerNotRunning);
        }

        info!("Shutting down telemetry server");

        self.shutdown_notify.notify_waiters();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(self.config.shutdown_timeout, handle).await;
        }

        // Dropping the producer lets the writer drain the queue and stop.
        self.spool.lock().await.take();
        if let Some(writer) = self.spool_writer.lock().await.take() {
            let _ = tokio::time::timeout(self.config.shutdown_timeout, writer).await;
        }

        info!("Telemetry server shutdown complete");

        Ok(())
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the server's bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of usernames currently online
    pub fn users_online(&self) -> usize {
        self.registry.count()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_sessions: self.metrics.active_sessions() as usize,
            total_sessions: self.metrics.total_sessions(),
            users_online: self.registry.count(),
            bind_address: self.bind_address(),
            uptime: self.started_at.elapsed(),
            started_at: self.started_at,
        }
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the online-user registry
    pub fn registry(&self) -> Arc<OnlineRegistry> {
        self.registry.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for TelemetryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryServer")
            .field("bind_address", &self.bind_address())
            .field("running", &self.is_running())
            .field("users_online", &self.users_online())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for TelemetryServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            warn!("TelemetryServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.shutdown_notify.notify_waiters();
        }
    }
}
