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

//! Synthetic telemetry feed
//!
//! A lazy, finite, non-restartable source of well-formed record lines used
//! for demo and load traffic. Real deployments hand the driver their own
//! iterator instead.

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Randomized `timestamp;code;value` lines, one per iteration.
///
/// Codes fall in `0..=11`; values are integers in `0..=100` half the time and
/// unit-interval floats otherwise, mimicking mixed-sensor traffic.
#[derive(Debug)]
pub struct SyntheticFeed {
    remaining: usize,
}

impl SyntheticFeed {
    /// Create a feed that yields `count` records
    pub fn new(count: usize) -> Self {
        Self { remaining: count }
    }
}

impl Iterator for SyntheticFeed {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or(0);

        let mut rng = rand::rng();
        let code: u32 = rng.random_range(0..=11);
        let value = if rng.random_bool(0.5) {
            rng.random_range(0..=100).to_string()
        } else {
            format!("{:.6}", rng.random::<f64>())
        };

        Some(format!("{timestamp};{code};{value}"))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SyntheticFeed {}
