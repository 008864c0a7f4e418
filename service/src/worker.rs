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

//! Session worker implementation
//!
//! The SessionWorker is responsible for the lifecycle of a single accepted
//! connection, including:
//! - The authentication handshake
//! - The streaming read loop and frame dispatch
//! - Heartbeat echoes
//! - Registry cleanup and the persistence handoff

use crate::spool::SessionSpool;
use crate::{OnlineRegistry, RejectReason, Result, ServerMetrics, Session, SessionId, SessionPhase};
use futures_util::{SinkExt, StreamExt};
use metrics::counter;
use std::net::SocketAddr;
use std::sync::Arc;
use telemetrix_linecodec::{Frame, LineCodec};
use telemetrix_store::TelemetryStore;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of the authentication handshake
enum AuthOutcome {
    Accepted,
    Rejected(RejectReason),
}

/// Worker that serves a single telemetry session.
///
/// The worker exclusively owns the socket and the [`Session`]; the registry
/// and the spool are the only shared state it touches, both injected at
/// construction.
pub struct SessionWorker {
    session: Session,
    framed: Framed<TcpStream, LineCodec>,
    registry: Arc<OnlineRegistry>,
    spool: SessionSpool,
    store: Arc<TelemetryStore>,
    metrics: Arc<ServerMetrics>,
}

impl SessionWorker {
    /// Create a worker for a freshly accepted socket
    pub fn new(
        id: SessionId,
        socket: TcpStream,
        peer_addr: SocketAddr,
        max_line_length: usize,
        registry: Arc<OnlineRegistry>,
        spool: SessionSpool,
        store: Arc<TelemetryStore>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        let codec = LineCodec::with_max_line_length(max_line_length);
        Self {
            session: Session::new(id, peer_addr),
            framed: Framed::new(socket, codec),
            registry,
            spool,
            store,
            metrics,
        }
    }

    /// Run the worker until the session ends, then clean up.
    ///
    /// This is the entry point spawned by the accept loop. Every exit path,
    /// graceful or not, flows through `cleanup` exactly once.
    #[instrument(skip(self), fields(session_id = %self.session.id()))]
    pub async fn run(mut self) {
        self.metrics.session_opened();
        counter!("telemetrix.sessions.total").increment(1);

        if let Err(error) = self.event_loop().await {
            debug!(%error, "Session ended on transport error");
        }

        self.cleanup();
    }

    /// Authenticate, then serve frames until EOF, `Finished` or an error.
    async fn event_loop(&mut self) -> Result<()> {
        match self.authenticate().await? {
            AuthOutcome::Accepted => {}
            AuthOutcome::Rejected(reason) => {
                self.metrics.auth_rejected();
                counter!("telemetrix.auth.rejections").increment(1);
                warn!(peer_addr = %self.session.peer_addr(), %reason, "Session rejected");
                return Ok(());
            }
        }

        while self.session.phase() == SessionPhase::Streaming {
            match self.framed.next().await {
                Some(Ok(Frame::KeepAlive)) => {
                    self.session.touch();
                    self.metrics.heartbeat_echoed();
                    // Best effort: a failed echo is not fatal, the read side
                    // decides when this session is over.
                    if let Err(error) = self.framed.send(Frame::KeepAlive).await {
                        warn!(%error, "Failed to echo heartbeat probe");
                    }
                }
                Some(Ok(Frame::Finished)) => {
                    self.session.finish();
                }
                Some(Ok(frame)) => {
                    let stored = self.session.absorb(&frame.as_line());
                    self.metrics.record_received(stored);
                }
                Some(Err(error)) => return Err(error.into()),
                None => break,
            }
        }

        Ok(())
    }

    /// Read the greeting and decide whether this session may stream.
    ///
    /// The registry claim is a single atomic insert-if-absent, taken before
    /// the password check; a claim that fails verification is released
    /// immediately. `Session::username` is only set once the claim is ours
    /// to keep, so cleanup never releases another session's entry.
    async fn authenticate(&mut self) -> Result<AuthOutcome> {
        let line = match self.framed.next().await {
            Some(Ok(Frame::Line(line))) => line,
            Some(Ok(_)) | None => {
                self.session.reject();
                return Ok(AuthOutcome::Rejected(RejectReason::MalformedGreeting));
            }
            Some(Err(error)) => return Err(error.into()),
        };

        let Some((username, password)) = Frame::parse_greeting(&line) else {
            self.session.reject();
            return Ok(AuthOutcome::Rejected(RejectReason::MalformedGreeting));
        };

        if !self.registry.try_login(&username, self.session.id()) {
            self.session.reject();
            return Ok(AuthOutcome::Rejected(RejectReason::AlreadyOnline));
        }

        let verified = match self.store.credentials().verify(&username, &password) {
            Ok(verified) => verified,
            Err(error) => {
                self.registry.logout(&username);
                self.session.reject();
                error!(%error, "Credential lookup failed");
                return Ok(AuthOutcome::Rejected(RejectReason::BadCredentials));
            }
        };
        if !verified {
            self.registry.logout(&username);
            self.session.reject();
            return Ok(AuthOutcome::Rejected(RejectReason::BadCredentials));
        }

        info!(
            username = %username,
            peer_addr = %self.session.peer_addr(),
            "Authorized"
        );
        self.session.authenticate(username);
        self.framed.send(Frame::Accept).await?;

        Ok(AuthOutcome::Accepted)
    }

    /// Release shared state and hand the payload to the spool.
    ///
    /// Runs exactly once per session, on every exit path of the event loop.
    fn cleanup(self) {
        let Self {
            session,
            registry,
            spool,
            metrics,
            ..
        } = self;

        if let Some(username) = session.username() {
            registry.logout(username);
        }

        metrics.session_closed(session.elapsed());
        counter!("telemetrix.sessions.closed").increment(1);

        match session.phase() {
            SessionPhase::Rejected => {
                // the rejection itself was already logged with its reason
                debug!(peer_addr = %session.peer_addr(), "Rejected session closed");
            }
            _ => {
                let username = session.username().unwrap_or("-").to_string();
                let events = session.received();
                if let Some(entry) = session.into_spool_entry() {
                    metrics.session_spooled();
                    spool.enqueue(entry);
                }
                info!(username = %username, events, "Session finished");
            }
        }
    }
}

impl std::fmt::Debug for SessionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionWorker")
            .field("id", &self.session.id())
            .field("phase", &self.session.phase())
            .field("peer_addr", &self.session.peer_addr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    struct Harness {
        registry: Arc<OnlineRegistry>,
        store: Arc<TelemetryStore>,
        metrics: Arc<ServerMetrics>,
        spool_writer: JoinHandle<()>,
        worker_task: JoinHandle<()>,
        client: Framed<TcpStream, LineCodec>,
    }

    /// Spin up one worker over a real socket pair and hand back the client end.
    async fn harness() -> Harness {
        let (store, _) = TelemetryStore::open_temporary().unwrap();
        store.credentials().add_user("alice", "pw").unwrap();
        let store = Arc::new(store);

        let registry = Arc::new(OnlineRegistry::new());
        let metrics = Arc::new(ServerMetrics::new());
        let (spool, spool_writer) = SessionSpool::start(store.clone(), metrics.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let client = TcpStream::connect(addr).await.unwrap();
        let (socket, peer_addr) = accept.await.unwrap();

        let worker = SessionWorker::new(
            SessionId::new(1),
            socket,
            peer_addr,
            8192,
            registry.clone(),
            spool,
            store.clone(),
            metrics.clone(),
        );
        let worker_task = tokio::spawn(worker.run());

        Harness {
            registry,
            store,
            metrics,
            spool_writer,
            worker_task,
            client: Framed::new(client, LineCodec::new()),
        }
    }

    #[tokio::test]
    async fn test_happy_path_session_persists() {
        let mut harness = harness().await;

        harness
            .client
            .send(Frame::greeting("alice", "pw"))
            .await
            .unwrap();
        assert_eq!(
            harness.client.next().await.unwrap().unwrap(),
            Frame::Accept
        );
        assert!(harness.registry.is_online("alice"));

        for i in 0..5 {
            harness
                .client
                .send(Frame::Line(format!("167813498552{i};8;{i}")))
                .await
                .unwrap();
        }
        harness.client.send(Frame::Finished).await.unwrap();

        // server closes the connection after the finished frame
        assert!(harness.client.next().await.is_none());

        drop(harness.client);
        tokio::time::timeout(Duration::from_secs(5), harness.worker_task)
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), harness.spool_writer)
            .await
            .unwrap()
            .unwrap();

        assert!(!harness.registry.is_online("alice"));
        let ids = harness.store.sessions().user_sessions("alice").unwrap();
        assert_eq!(ids.len(), 1);
        let blob = harness
            .store
            .sessions()
            .export_session(ids[0])
            .unwrap()
            .unwrap();
        assert_eq!(blob.blob.split(|b| *b == b'\n').filter(|l| !l.is_empty()).count(), 5);
    }

    #[tokio::test]
    async fn test_keepalive_is_echoed_not_stored() {
        let mut harness = harness().await;

        harness
            .client
            .send(Frame::greeting("alice", "pw"))
            .await
            .unwrap();
        assert_eq!(harness.client.next().await.unwrap().unwrap(), Frame::Accept);

        harness.client.send(Frame::KeepAlive).await.unwrap();
        assert_eq!(
            harness.client.next().await.unwrap().unwrap(),
            Frame::KeepAlive
        );

        harness.client.send(Frame::Finished).await.unwrap();
        assert!(harness.client.next().await.is_none());

        drop(harness.client);
        tokio::time::timeout(Duration::from_secs(5), harness.worker_task)
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), harness.spool_writer)
            .await
            .unwrap()
            .unwrap();

        // probes are liveness only: no records, nothing persisted
        assert_eq!(harness.store.sessions().session_count().unwrap(), 0);
        assert_eq!(harness.metrics.snapshot().heartbeats_echoed, 1);
    }

    #[tokio::test]
    async fn test_bad_password_rejected_and_registry_clean() {
        let mut harness = harness().await;

        harness
            .client
            .send(Frame::greeting("alice", "wrong"))
            .await
            .unwrap();

        // rejection sends no accept frame, the server just closes
        assert!(harness.client.next().await.is_none());

        drop(harness.client);
        tokio::time::timeout(Duration::from_secs(5), harness.worker_task)
            .await
            .unwrap()
            .unwrap();

        // the provisional registry claim must have been released
        assert!(!harness.registry.is_online("alice"));
        assert_eq!(harness.metrics.snapshot().auth_rejections, 1);
    }

    #[tokio::test]
    async fn test_malformed_greeting_rejected() {
        let mut harness = harness().await;

        harness
            .client
            .send(Frame::Line("alice:pw:extra".to_string()))
            .await
            .unwrap();
        assert!(harness.client.next().await.is_none());

        drop(harness.client);
        tokio::time::timeout(Duration::from_secs(5), harness.worker_task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(harness.metrics.snapshot().auth_rejections, 1);
    }

    #[tokio::test]
    async fn test_eof_persists_received_records() {
        let mut harness = harness().await;

        harness
            .client
            .send(Frame::greeting("alice", "pw"))
            .await
            .unwrap();
        assert_eq!(harness.client.next().await.unwrap().unwrap(), Frame::Accept);

        harness
            .client
            .send(Frame::Line("1;2;3".to_string()))
            .await
            .unwrap();

        // disconnect without a finished frame
        drop(harness.client);
        tokio::time::timeout(Duration::from_secs(5), harness.worker_task)
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), harness.spool_writer)
            .await
            .unwrap()
            .unwrap();

        assert!(!harness.registry.is_online("alice"));
        assert_eq!(harness.store.sessions().session_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_malformed_records_counted_not_stored() {
        let mut harness = harness().await;

        harness
            .client
            .send(Frame::greeting("alice", "pw"))
            .await
            .unwrap();
        assert_eq!(harness.client.next().await.unwrap().unwrap(), Frame::Accept);

        harness
            .client
            .send(Frame::Line("1;2;3".to_string()))
            .await
            .unwrap();
        harness
            .client
            .send(Frame::Line("garbage".to_string()))
            .await
            .unwrap();
        harness
            .client
            .send(Frame::Line("4;5".to_string()))
            .await
            .unwrap();
        harness.client.send(Frame::Finished).await.unwrap();
        assert!(harness.client.next().await.is_none());

        drop(harness.client);
        tokio::time::timeout(Duration::from_secs(5), harness.worker_task)
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), harness.spool_writer)
            .await
            .unwrap()
            .unwrap();

        let snapshot = harness.metrics.snapshot();
        assert_eq!(snapshot.records_received, 3);
        assert_eq!(snapshot.records_stored, 1);

        let ids = harness.store.sessions().user_sessions("alice").unwrap();
        let blob = harness
            .store
            .sessions()
            .export_session(ids[0])
            .unwrap()
            .unwrap();
        assert_eq!(blob.blob, b"1;2;3\n");
    }
}
