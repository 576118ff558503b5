//! Load stage metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Load stage metrics
///
/// Shared between the merge stream and whoever reports on the query.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Frames handed to the compute stage
    pub frames_loaded: AtomicU64,

    /// Malformed frames skipped
    pub frames_skipped: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record frame loaded
    pub fn record_loaded(&self) {
        self.frames_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record malformed frame
    pub fn record_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_loaded: self.frames_loaded.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_loaded: u64,
    pub frames_skipped: u64,
}
