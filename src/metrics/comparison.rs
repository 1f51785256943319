//! Key comparison counter.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Counts key-to-key comparisons performed by index operations.
///
/// The tree calls [`increment`](Self::increment) once for every comparison,
/// including the one that detects equality. Only the owner of the counter
/// (usually a benchmark harness) calls [`reset`](Self::reset).
///
/// Trees hold an `Arc<ComparisonCounter>`, so several trees can share one
/// counter or each get their own.
///
/// # Memory Ordering
/// All operations use `Ordering::Relaxed`: the count is a standalone
/// statistic and never synchronizes other memory.
///
/// # Example
/// ```
/// use btree_index::ComparisonCounter;
///
/// let counter = ComparisonCounter::new();
/// counter.increment();
/// counter.increment();
/// assert_eq!(counter.read(), 2);
///
/// counter.reset();
/// assert_eq!(counter.read(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ComparisonCounter {
    count: AtomicU64,
}

impl ComparisonCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// Record one comparison.
    #[inline]
    pub fn increment(&self) {
        self.count.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Record `n` comparisons at once.
    #[inline]
    pub fn add(&self, n: u64) {
        self.count.fetch_add(n, AtomicOrdering::Relaxed);
    }

    /// Current count.
    #[inline]
    pub fn read(&self) -> u64 {
        self.count.load(AtomicOrdering::Relaxed)
    }

    /// Set the count back to zero.
    pub fn reset(&self) {
        self.count.store(0, AtomicOrdering::Relaxed);
    }

    /// Compare two keys, counting the comparison.
    #[inline]
    pub fn compare<K: Ord + ?Sized>(&self, left: &K, right: &K) -> Ordering {
        self.increment();
        left.cmp(right)
    }
}

impl fmt::Display for ComparisonCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Comparisons({})", self.read())
    }
}
