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

//! Lock-free metrics for the telemetry server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
///
/// All metrics are stored as atomics and can be accessed concurrently
/// without locks. Use the `snapshot()` method to get a consistent view
/// of all metrics at a point in time.
#[derive(Debug)]
pub struct ServerMetrics {
    // Session counts
    total_sessions: AtomicU64,
    active_sessions: AtomicU64,
    auth_rejections: AtomicU64,

    // Ingest throughput
    records_received: AtomicU64,
    records_stored: AtomicU64,
    heartbeats_echoed: AtomicU64,

    // Persistence path
    sessions_spooled: AtomicU64,
    sessions_persisted: AtomicU64,
    persist_failures: AtomicU64,

    // Timing (stored as nanoseconds)
    total_session_duration_ns: AtomicU64,

    // Server start time
    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            total_sessions: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            auth_rejections: AtomicU64::new(0),
            records_received: AtomicU64::new(0),
            records_stored: AtomicU64::new(0),
            heartbeats_echoed: AtomicU64::new(0),
            sessions_spooled: AtomicU64::new(0),
            sessions_persisted: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
            total_session_duration_ns: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record a new session being opened
    pub fn session_opened(&self) {
        self.total_sessions.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session closing after the given duration
    pub fn session_closed(&self, duration: Duration) {
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
        self.total_session_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Record an authentication rejection
    pub fn auth_rejected(&self) {
        self.auth_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one incoming record line, stored or dropped
    pub fn record_received(&self, stored: bool) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
        if stored {
            self.records_stored.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a heartbeat probe answered
    pub fn heartbeat_echoed(&self) {
        self.heartbeats_echoed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session blob handed to the spool
    pub fn session_spooled(&self) {
        self.sessions_spooled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session blob durably written
    pub fn session_persisted(&self) {
        self.sessions_persisted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session blob dropped on a storage failure
    pub fn persist_failed(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of sessions currently being served
    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    /// Total sessions since server start
    pub fn total_sessions(&self) -> u64 {
        self.total_sessions.load(Ordering::Relaxed)
    }

    /// Get a consistent point-in-time view of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_sessions: self.total_sessions.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            auth_rejections: self.auth_rejections.load(Ordering::Relaxed),
            records_received: self.records_received.load(Ordering::Relaxed),
            records_stored: self.records_stored.load(Ordering::Relaxed),
            heartbeats_echoed: self.heartbeats_echoed.load(Ordering::Relaxed),
            sessions_spooled: self.sessions_spooled.load(Ordering::Relaxed),
            sessions_persisted: self.sessions_persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            total_session_duration: Duration::from_nanos(
                self.total_session_duration_ns.load(Ordering::Relaxed),
            ),
            uptime: self.started_at.elapsed(),
        }
    }
}

/// Point-in-time view of the server metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Total sessions since server start
    pub total_sessions: u64,
    /// Sessions currently being served
    pub active_sessions: u64,
    /// Authentication rejections
    pub auth_rejections: u64,
    /// Record lines received, valid or not
    pub records_received: u64,
    /// Record lines appended to session blobs
    pub records_stored: u64,
    /// Heartbeat probes answered
    pub heartbeats_echoed: u64,
    /// Session blobs handed to the spool
    pub sessions_spooled: u64,
    /// Session blobs durably written
    pub sessions_persisted: u64,
    /// Session blobs dropped on storage failure
    pub persist_failures: u64,
    /// Summed duration of all closed sessions
    pub total_session_duration: Duration,
    /// Server uptime
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle_counts() {
        let metrics = ServerMetrics::new();

        metrics.session_opened();
        metrics.session_opened();
        assert_eq!(metrics.active_sessions(), 2);
        assert_eq!(metrics.total_sessions(), 2);

        metrics.session_closed(Duration::from_millis(5));
        assert_eq!(metrics.active_sessions(), 1);
        assert_eq!(metrics.total_sessions(), 2);

        let snapshot = metrics.snapshot();
        assert!(snapshot.total_session_duration >= Duration::from_millis(5));
    }

    #[test]
    fn test_record_counts() {
        let metrics = ServerMetrics::new();

        metrics.record_received(true);
        metrics.record_received(true);
        metrics.record_received(false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.records_received, 3);
        assert_eq!(snapshot.records_stored, 2);
    }

    #[test]
    fn test_persistence_counts() {
        let metrics = ServerMetrics::new();

        metrics.session_spooled();
        metrics.session_persisted();
        metrics.session_spooled();
        metrics.persist_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sessions_spooled, 2);
        assert_eq!(snapshot.sessions_persisted, 1);
        assert_eq!(snapshot.persist_failures, 1);
    }
}
