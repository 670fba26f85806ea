//! Entry threshold detection: a dynamic (lower, upper) pair from a 1-D signal.
//!
//! The detector scans the entry signal for samples above a threshold and
//! records the index of the first and of the last one. The pair is sticky:
//! a signal with no qualifying sample leaves the previous pair in place, so
//! the slice holds its last window while the signal is quiet.

use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Samples strictly above this value qualify.
pub const ENTRY_THRESHOLD: f64 = 0.01;

/// Dynamic bounds carried across ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicEntryState {
    /// Index of the first qualifying sample of the last hit.
    pub lower: usize,
    /// Index of the last qualifying sample of the last hit.
    pub upper: usize,
    /// Whether the most recent scan found a qualifying sample.
    #[serde(skip)]
    pub seen: bool,
}

/// Threshold detector over an entry signal.
#[derive(Clone, Debug)]
pub struct EntryThresholdDetector {
    threshold: f64,
    state: DynamicEntryState,
}

impl EntryThresholdDetector {
    /// Detector using [`ENTRY_THRESHOLD`].
    pub fn new() -> Self {
        Self::with_threshold(ENTRY_THRESHOLD)
    }

    /// Detector with a custom threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            state: DynamicEntryState::default(),
        }
    }

    /// Get the threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Get the stored pair.
    pub fn state(&self) -> &DynamicEntryState {
        &self.state
    }

    /// Forget the stored pair.
    pub fn reset(&mut self) {
        self.state = DynamicEntryState::default();
    }

    /// Scan `signal` in logical order and update the stored pair.
    ///
    /// Returns whether any sample qualified. If none did, `lower` and `upper`
    /// keep their previous values.
    pub fn detect(&mut self, signal: &Matrix) -> bool {
        self.state.seen = false;
        let mut first = None;
        let mut last = 0;
        for (index, value) in signal.values_f64().enumerate() {
            if value > self.threshold {
                first.get_or_insert(index);
                last = index;
            }
        }

        match first {
            Some(lower) => {
                self.state = DynamicEntryState {
                    lower,
                    upper: last,
                    seen: true,
                };
                trace!(lower, upper = last, "entry signal above threshold");
            }
            None => {
                trace!(
                    lower = self.state.lower,
                    upper = self.state.upper,
                    "entry signal quiet, keeping previous window"
                );
            }
        }
        self.state.seen
    }
}

impl Default for EntryThresholdDetector {
    fn default() -> Self {
        Self::new()
    }
}
