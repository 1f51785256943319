//! Structural statistics for the B+-tree.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the structural changes a tree performs.
///
/// All fields are atomic so a snapshot can be taken through `&self`.
/// `Ordering::Relaxed` is enough: every counter is independent.
///
/// # Example
/// ```
/// use btree_index::TreeStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = TreeStats::new();
/// stats.leaf_splits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().leaf_splits, 1);
/// ```
#[derive(Debug, Default)]
pub struct TreeStats {
    /// Number of leaf nodes split on overflow.
    pub leaf_splits: AtomicU64,

    /// Number of internal nodes split on overflow.
    pub internal_splits: AtomicU64,

    /// Number of entries or separators borrowed from a sibling.
    pub borrows: AtomicU64,

    /// Number of sibling merges.
    pub merges: AtomicU64,

    /// Number of times a new root was created (height grew).
    pub root_splits: AtomicU64,

    /// Number of times the root was replaced by its only child (height shrank).
    pub root_collapses: AtomicU64,
}

impl TreeStats {
    /// Create a stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> TreeStatsSnapshot {
        TreeStatsSnapshot {
            leaf_splits: self.leaf_splits.load(Ordering::Relaxed),
            internal_splits: self.internal_splits.load(Ordering::Relaxed),
            borrows: self.borrows.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
            root_splits: self.root_splits.load(Ordering::Relaxed),
            root_collapses: self.root_collapses.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.leaf_splits.store(0, Ordering::Relaxed);
        self.internal_splits.store(0, Ordering::Relaxed);
        self.borrows.store(0, Ordering::Relaxed);
        self.merges.store(0, Ordering::Relaxed);
        self.root_splits.store(0, Ordering::Relaxed);
        self.root_collapses.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time copy of [`TreeStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStatsSnapshot {
    pub leaf_splits: u64,
    pub internal_splits: u64,
    pub borrows: u64,
    pub merges: u64,
    pub root_splits: u64,
    pub root_collapses: u64,
}

impl TreeStatsSnapshot {
    /// Total number of node splits (leaf and internal).
    pub fn splits(&self) -> u64 {
        self.leaf_splits + self.internal_splits
    }

    /// Total number of underflow repairs (borrows and merges).
    pub fn rebalances(&self) -> u64 {
        self.borrows + self.merges
    }
}

impl fmt::Display for TreeStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ splits: {} ({} leaf, {} internal), borrows: {}, merges: {}, root splits: {}, root collapses: {} }}",
            self.splits(),
            self.leaf_splits,
            self.internal_splits,
            self.borrows,
            self.merges,
            self.root_splits,
            self.root_collapses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let snapshot = TreeStats::new().snapshot();
        assert_eq!(snapshot, TreeStatsSnapshot::default());
        assert_eq!(snapshot.splits(), 0);
        assert_eq!(snapshot.rebalances(), 0);
    }

    #[test]
    fn test_stats_record_and_reset() {
        let stats = TreeStats::new();
        TreeStats::record(&stats.leaf_splits);
        TreeStats::record(&stats.leaf_splits);
        TreeStats::record(&stats.internal_splits);
        TreeStats::record(&stats.borrows);
        TreeStats::record(&stats.merges);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.splits(), 3);
        assert_eq!(snapshot.rebalances(), 2);

        stats.reset();
        assert_eq!(stats.snapshot(), TreeStatsSnapshot::default());
    }

    #[test]
    fn test_stats_display() {
        let stats = TreeStats::new();
        stats.leaf_splits.fetch_add(4, Ordering::Relaxed);
        stats.merges.fetch_add(2, Ordering::Relaxed);

        let display = format!("{}", stats.snapshot());
        assert!(display.contains("splits: 4"));
        assert!(display.contains("merges: 2"));
    }
}
