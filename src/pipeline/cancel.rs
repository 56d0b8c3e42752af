//! Cooperative cancellation for aggregate runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag polled between passes of an aggregate loop.
///
/// Clones share the flag, so a signal handler or another thread can hold one
/// while the graph runs. The loop resets the flag when it stops on it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    requested: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.requested.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.requested.store(false, Ordering::Relaxed);
    }
}
