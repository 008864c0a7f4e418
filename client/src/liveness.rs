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

//! Heartbeat liveness state
//!
//! One instance is shared by the driver's data loop and its two heartbeat
//! loops. The counter is atomic and the contact timestamp sits behind one
//! small lock, so the three tasks never race destructively on it.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, Instant};

/// Sliding-window liveness counter shared by one session's loops.
///
/// The counter starts at `-tolerance`. Each probe sent without recent contact
/// moves it up by one, each answered probe moves it back down. Reaching zero
/// means the tolerated number of probes went unanswered and the session is
/// declared dead. This is a tolerant sliding window, not strict ping-pong:
/// a late answer can pull an ailing session back to health.
#[derive(Debug)]
pub struct Liveness {
    missed: AtomicI64,
    finished: AtomicBool,
    last_contact: Mutex<Instant>,
}

impl Liveness {
    /// Create liveness state tolerating `probe_tolerance` unanswered probes
    pub fn new(probe_tolerance: u32) -> Self {
        Self {
            missed: AtomicI64::new(-i64::from(probe_tolerance)),
            finished: AtomicBool::new(false),
            last_contact: Mutex::new(Instant::now()),
        }
    }

    /// Record an answered probe: healthier by one, contact refreshed
    pub fn probe_answered(&self) {
        self.missed.fetch_sub(1, Ordering::SeqCst);
        self.touch();
    }

    /// Record a probe about to be sent after a silent window.
    ///
    /// Refreshes the contact timestamp so the window restarts, and returns
    /// the counter after the increment.
    pub fn probe_missed(&self) -> i64 {
        self.touch();
        self.missed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current counter value
    pub fn missed(&self) -> i64 {
        self.missed.load(Ordering::SeqCst)
    }

    /// Whether the missed-probe threshold has been reached
    pub fn is_lost(&self) -> bool {
        self.missed() >= 0
    }

    /// Mark the session finished
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    /// Whether the session has been marked finished
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Whether the heartbeat loops should keep running.
    ///
    /// Loops run until the session is finished and no probes are outstanding
    /// beyond the healthy baseline; a closed socket ends them earlier.
    pub fn should_run(&self) -> bool {
        !self.is_finished() || self.missed() < 0
    }

    /// Time since the last contact, answered or sent
    pub fn since_contact(&self) -> Duration {
        self.last_contact.lock().unwrap().elapsed()
    }

    fn touch(&self) {
        *self.last_contact.lock().unwrap() = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_reached_after_tolerance_misses() {
        let liveness = Liveness::new(3);
        assert!(!liveness.is_lost());

        assert_eq!(liveness.probe_missed(), -2);
        assert_eq!(liveness.probe_missed(), -1);
        assert!(!liveness.is_lost());

        assert_eq!(liveness.probe_missed(), 0);
        assert!(liveness.is_lost());
    }

    #[test]
    fn test_answered_probe_pulls_counter_back() {
        let liveness = Liveness::new(3);

        // two missed, one answered: the session survives a third miss
        liveness.probe_missed();
        liveness.probe_missed();
        liveness.probe_answered();
        liveness.probe_missed();
        assert!(!liveness.is_lost());

        // but two more misses push it over
        liveness.probe_missed();
        assert!(!liveness.is_lost());
        liveness.probe_missed();
        assert!(liveness.is_lost());
    }

    #[test]
    fn test_should_run_until_finished_and_drained() {
        let liveness = Liveness::new(3);
        assert!(liveness.should_run());

        // finished but still below the baseline: keep running
        liveness.finish();
        assert!(liveness.should_run());

        // counter no longer negative: stop
        liveness.probe_missed();
        liveness.probe_missed();
        liveness.probe_missed();
        assert!(!liveness.should_run());
    }

    #[test]
    fn test_contact_window_restarts_on_probe() {
        let liveness = Liveness::new(3);
        std::thread::sleep(Duration::from_millis(5));
        assert!(liveness.since_contact() >= Duration::from_millis(5));

        liveness.probe_missed();
        assert!(liveness.since_contact() < Duration::from_millis(5));
    }
}
