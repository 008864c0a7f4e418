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

//! Session driver
//!
//! Drives the client half of the protocol state machine: connect,
//! authenticate, stream records, keep the heartbeat alive, terminate. One
//! driver task plus two heartbeat tasks per session; the three share a
//! [`Liveness`] and nothing else.

use crate::{ClientConfig, Liveness, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetrix_linecodec::{Frame, LineCodec};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep, timeout};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// Write half of the session, shared by the data loop and the probe sender
type SharedSink = Arc<Mutex<SplitSink<Framed<TcpStream, LineCodec>, Frame>>>;

/// Terminal reason of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Feed exhausted, finished frame sent
    Completed,
    /// Authentication was not accepted
    Rejected,
    /// The server was not there to take the connection
    ConnectionRefused,
    /// The missed-probe threshold was reached mid-stream
    LivenessLost,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Completed => write!(f, "normal"),
            Outcome::Rejected => write!(f, "rejected"),
            Outcome::ConnectionRefused => write!(f, "connection-refused"),
            Outcome::LivenessLost => write!(f, "liveness-lost"),
        }
    }
}

/// What happened during one session run
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Terminal reason
    pub outcome: Outcome,
    /// Records written to the socket
    pub records_sent: u64,
    /// Wall-clock duration of the whole attempt
    pub elapsed: Duration,
}

impl std::fmt::Display for SessionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} after {} records in {:.02}s",
            self.outcome,
            self.records_sent,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Client half of the session protocol.
///
/// A driver makes exactly one connection attempt per `run` call; there is no
/// reconnection policy.
pub struct SessionDriver {
    config: ClientConfig,
}

impl SessionDriver {
    /// Create a driver for the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// The driver's configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run one session, streaming every line the feed yields.
    ///
    /// Session-level failures (rejection, refusal, liveness loss) are
    /// reported in the returned [`SessionReport`]; only infrastructure
    /// failures surface as errors.
    pub async fn run<F>(&self, feed: F) -> Result<SessionReport>
    where
        F: IntoIterator<Item = String>,
    {
        let started = Instant::now();
        let address = self.config.address();

        info!(username = %self.config.username, "Connecting to {}...", address);
        let stream = match timeout(self.config.connect_timeout, TcpStream::connect(&address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(error)) if error.kind() == io::ErrorKind::ConnectionRefused => {
                info!(username = %self.config.username, "Connection refused");
                return Ok(self.report(Outcome::ConnectionRefused, 0, started));
            }
            Ok(Err(error)) => return Err(error.into()),
            Err(_) => return Err(crate::ClientError::ConnectionTimeout),
        };

        let mut framed = Framed::new(stream, LineCodec::new());
        framed
            .send(Frame::greeting(
                &self.config.username,
                &self.config.password,
            ))
            .await?;

        match framed.next().await {
            Some(Ok(Frame::Accept)) => {
                info!(username = %self.config.username, "Authorized");
            }
            Some(Err(error)) => return Err(error.into()),
            Some(Ok(_)) | None => {
                info!(username = %self.config.username, "Session rejected");
                return Ok(self.report(Outcome::Rejected, 0, started));
            }
        }

        let liveness = Arc::new(Liveness::new(self.config.probe_tolerance));
        let wake = Arc::new(Notify::new());
        let (sink, stream) = framed.split();
        let sink: SharedSink = Arc::new(Mutex::new(sink));

        let mut receiver = tokio::spawn(recv_probes(stream, liveness.clone(), wake.clone()));
        let mut sender = tokio::spawn(send_probes(
            sink.clone(),
            liveness.clone(),
            wake.clone(),
            self.config.heartbeat_timeout,
        ));

        // Data loop: pull from the feed, abort early on liveness loss.
        let mut records_sent = 0u64;
        let mut lost = false;
        for line in feed {
            if liveness.is_lost() {
                warn!(username = %self.config.username, "Connection lost");
                lost = true;
                break;
            }
            if let Err(error) = sink.lock().await.send(Frame::Line(line)).await {
                // The socket died under us; the peer is as good as silent.
                warn!(username = %self.config.username, %error, "Write failed mid-stream");
                lost = true;
                break;
            }
            records_sent += 1;
            if let Some(pace) = self.config.pace {
                sleep(pace).await;
            }
        }

        if !lost {
            // Best effort: the socket may already be half closed.
            if let Err(error) = sink.lock().await.send(Frame::Finished).await {
                debug!(%error, "Could not send finished frame");
            }
        }

        liveness.finish();
        wake.notify_waiters();

        // Wind down the heartbeat loops. They stop on their own once the
        // server closes the socket; past the grace period the session is
        // over regardless, so the socket is torn down by force.
        let grace = self.config.heartbeat_timeout * 2;
        if timeout(grace, &mut receiver).await.is_err() {
            receiver.abort();
        }
        if timeout(grace, &mut sender).await.is_err() {
            sender.abort();
        }

        let outcome = if lost {
            Outcome::LivenessLost
        } else {
            Outcome::Completed
        };
        let report = self.report(outcome, records_sent, started);
        info!(username = %self.config.username, "Session over: {report}");
        Ok(report)
    }

    fn report(&self, outcome: Outcome, records_sent: u64, started: Instant) -> SessionReport {
        SessionReport {
            outcome,
            records_sent,
            elapsed: started.elapsed(),
        }
    }
}

impl std::fmt::Debug for SessionDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDriver")
            .field("address", &self.config.address())
            .field("username", &self.config.username)
            .finish()
    }
}

/// Receive loop: every echoed probe makes the session healthier.
async fn recv_probes(
    mut stream: SplitStream<Framed<TcpStream, LineCodec>>,
    liveness: Arc<Liveness>,
    wake: Arc<Notify>,
) {
    while liveness.should_run() {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Frame::KeepAlive)) => {
                    debug!("KA <-");
                    liveness.probe_answered();
                }
                // Nothing else is expected once streaming; ignore it.
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    debug!(%error, "Receive loop ending on read error");
                    break;
                }
                None => break,
            },
            _ = wake.notified() => {}
        }
    }
}

/// Send loop: a silent window costs one count and emits a probe.
async fn send_probes(
    sink: SharedSink,
    liveness: Arc<Liveness>,
    wake: Arc<Notify>,
    heartbeat_timeout: Duration,
) {
    while liveness.should_run() {
        let idle = liveness.since_contact();
        if idle >= heartbeat_timeout {
            let missed = liveness.probe_missed();
            debug!(missed, "KA ->");
            if sink.lock().await.send(Frame::KeepAlive).await.is_err() {
                break;
            }
        } else {
            tokio::select! {
                _ = sleep(heartbeat_timeout - idle) => {}
                _ = wake.notified() => {}
            }
        }
    }
}
