//! Metrics collection for monitoring the feed and predictor

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Collected metrics for the service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Text frames received from the feed
    pub frames_received: u64,
    /// Frames dropped as malformed
    pub frames_discarded: u64,
    /// Settled rounds appended to the history
    pub rounds_recorded: u64,
    /// Settled rounds rejected as invalid
    pub rounds_ignored: u64,
    /// Feed WebSocket reconnects
    pub feed_reconnects: u64,
    /// Heuristic errors swallowed by the engine
    pub heuristic_errors: u64,
}

/// Thread-safe metrics collector
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    frames_received: AtomicU64,
    frames_discarded: AtomicU64,
    rounds_recorded: AtomicU64,
    rounds_ignored: AtomicU64,
    feed_reconnects: AtomicU64,
    heuristic_errors: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_frames_received(&self) {
        self.inner.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_frames_discarded(&self) {
        self.inner.frames_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rounds_recorded(&self) {
        self.inner.rounds_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rounds_ignored(&self) {
        self.inner.rounds_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_feed_reconnects(&self) {
        self.inner.feed_reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// The engine owns the authoritative count, this mirrors it
    pub fn set_heuristic_errors(&self, count: u64) {
        self.inner.heuristic_errors.store(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.inner.frames_received.load(Ordering::Relaxed),
            frames_discarded: self.inner.frames_discarded.load(Ordering::Relaxed),
            rounds_recorded: self.inner.rounds_recorded.load(Ordering::Relaxed),
            rounds_ignored: self.inner.rounds_ignored.load(Ordering::Relaxed),
            feed_reconnects: self.inner.feed_reconnects.load(Ordering::Relaxed),
            heuristic_errors: self.inner.heuristic_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();
        metrics.inc_frames_received();
        clone.inc_frames_received();
        clone.inc_feed_reconnects();
        clone.set_heuristic_errors(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.feed_reconnects, 1);
        assert_eq!(snapshot.heuristic_errors, 4);
        assert_eq!(snapshot.rounds_recorded, 0);
    }
}
