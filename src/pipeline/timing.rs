//! Summaries over per-node timing samples.

use serde::Serialize;
use std::time::Duration;

/// Aggregate view of the samples a `timeit` node recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingSummary {
    pub count: usize,
    pub total: Duration,
    pub mean: Duration,
    pub max: Duration,
}

impl TimingSummary {
    /// `None` when no sample was recorded.
    pub fn from_samples(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let total: Duration = samples.iter().sum();
        let max = samples.iter().copied().max().unwrap_or_default();
        Some(Self {
            count: samples.len(),
            total,
            mean: total / samples.len() as u32,
            max,
        })
    }
}
