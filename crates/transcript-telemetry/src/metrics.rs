//! Accumulator metrics counters.
//!
//! `AccumulatorMetrics` is a cheap `Clone` handle (an `Arc<RwLock<..>>`
//! around a plain counters struct) in the same shape as the performance
//! metrics types the accumulator's teacher crate used for STT: a single
//! shared handle that many call sites can increment, with `snapshot()`
//! handing back an inert, `Copy`able record for `get_metrics()`.

use parking_lot::RwLock;
use std::sync::Arc;

/// Point-in-time snapshot of every counter listed in the accumulator's
/// metrics contract. Returned by value from `get_metrics()`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatorMetricsSnapshot {
    pub total_partials: u64,
    pub total_finals: u64,
    pub tokens_committed_by_stability: u64,
    pub tokens_committed_by_final: u64,
    pub tokens_committed_by_flush: u64,
    pub snapshot_expired_commits: u64,
    pub orphan_rescues: u64,
    pub late_final_hits: u64,
    pub segment_rolls: u64,
    pub dedup_full_blocks: u64,
    pub dedup_partial_overlaps: u64,
    pub dedup_tokens_removed: u64,
}

/// Shared, thread-safe counters handle.
#[derive(Clone, Default)]
pub struct AccumulatorMetrics {
    inner: Arc<RwLock<AccumulatorMetricsSnapshot>>,
}

impl AccumulatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an inert snapshot of the current counter values.
    pub fn snapshot(&self) -> AccumulatorMetricsSnapshot {
        *self.inner.read()
    }

    pub fn incr_total_partials(&self) {
        self.inner.write().total_partials += 1;
    }

    pub fn incr_total_finals(&self) {
        self.inner.write().total_finals += 1;
    }

    pub fn add_committed_by_stability(&self, n: u64) {
        if n > 0 {
            self.inner.write().tokens_committed_by_stability += n;
        }
    }

    pub fn add_committed_by_flush(&self, n: u64) {
        if n > 0 {
            self.inner.write().tokens_committed_by_flush += n;
        }
    }

    pub fn add_committed_by_final(&self, n: u64) {
        if n > 0 {
            self.inner.write().tokens_committed_by_final += n;
        }
    }

    pub fn add_snapshot_expired_commits(&self, n: u64) {
        if n > 0 {
            self.inner.write().snapshot_expired_commits += n;
        }
    }

    pub fn add_orphan_rescues(&self, n: u64) {
        if n > 0 {
            self.inner.write().orphan_rescues += n;
        }
    }

    pub fn incr_late_final_hits(&self) {
        self.inner.write().late_final_hits += 1;
    }

    pub fn incr_segment_rolls(&self) {
        self.inner.write().segment_rolls += 1;
    }

    pub fn incr_dedup_full_blocks(&self) {
        self.inner.write().dedup_full_blocks += 1;
    }

    pub fn incr_dedup_partial_overlaps(&self) {
        self.inner.write().dedup_partial_overlaps += 1;
    }

    pub fn add_dedup_tokens_removed(&self, n: u64) {
        if n > 0 {
            self.inner.write().dedup_tokens_removed += n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let m = AccumulatorMetrics::new();
        m.incr_total_partials();
        m.incr_total_partials();
        m.add_committed_by_stability(3);
        let snap = m.snapshot();
        assert_eq!(snap.total_partials, 2);
        assert_eq!(snap.tokens_committed_by_stability, 3);
    }

    #[test]
    fn clone_shares_the_same_counters() {
        let m = AccumulatorMetrics::new();
        let m2 = m.clone();
        m2.incr_total_finals();
        assert_eq!(m.snapshot().total_finals, 1);
    }

    #[test]
    fn zero_increments_are_no_ops() {
        let m = AccumulatorMetrics::new();
        m.add_orphan_rescues(0);
        assert_eq!(m.snapshot().orphan_rescues, 0);
    }
}
