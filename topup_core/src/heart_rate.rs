//! Heart-rate sample buffering.
//!
//! The sensor transport is external. Producers push beats-per-minute samples
//! through a [`HeartRateFeed`] at any rate and in any session phase; the
//! session clock only looks at the latest sample and the recent window.

use crate::state::SharedState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Number of recent samples kept for the rolling average
pub const WINDOW_SIZE: usize = 20;

/// Latest sample plus a bounded window of recent non-zero samples
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HeartRateWindow {
    latest: u16,
    recent: VecDeque<u16>,
    seen: bool,
}

impl HeartRateWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample; 0 means "no reading" and clears the latest value
    pub fn push(&mut self, bpm: u16) {
        self.latest = bpm;
        if bpm == 0 {
            return;
        }

        self.seen = true;
        self.recent.push_back(bpm);
        while self.recent.len() > WINDOW_SIZE {
            self.recent.pop_front();
        }
    }

    /// Latest sample, 0 when unknown
    pub fn latest(&self) -> u16 {
        self.latest
    }

    /// Mean of the recent window, `None` when it is empty
    pub fn average(&self) -> Option<f64> {
        if self.recent.is_empty() {
            return None;
        }
        let sum: u32 = self.recent.iter().map(|&bpm| u32::from(bpm)).sum();
        Some(f64::from(sum) / self.recent.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Whether any real reading ever arrived
    pub fn seen(&self) -> bool {
        self.seen
    }
}

/// Cloneable producer handle for heart-rate samples
#[derive(Clone)]
pub struct HeartRateFeed {
    shared: Arc<SharedState>,
}

impl HeartRateFeed {
    pub(crate) fn new(shared: Arc<SharedState>) -> Self {
        Self { shared }
    }

    /// Push one beats-per-minute sample
    pub fn push(&self, bpm: u16) {
        tracing::trace!("Heart rate sample: {} bpm", bpm);
        self.shared.mutate(|state| state.heart_rate.push(bpm));
    }
}
