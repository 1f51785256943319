//! The [`BTree`] index type.

use std::fmt;
use std::mem;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use tracing::trace;

use super::iter::{LeafBlocks, Range};
use super::node::{Context, InternalNode, Insertion, Node};
use super::validate::{self, InvariantViolation};
use crate::common::{BTreeConfig, Result};
use crate::metrics::{ComparisonCounter, TreeStats, TreeStatsSnapshot};

/// Indentation used by the `Display` dump, one step per level.
const INDENT: &str = "     ";

/// An in-memory B+-tree mapping unique keys to values.
///
/// Values live in the leaves. Every key comparison made by `search`,
/// `insert`, `delete` and `range` is recorded in the tree's
/// [`ComparisonCounter`].
///
/// # Example
/// ```
/// use btree_index::BTree;
///
/// let mut tree = BTree::new(4).unwrap();
/// for key in [10, 20, 5, 6, 12, 30, 7, 17] {
///     tree.insert(key, key * 100);
/// }
///
/// assert_eq!(tree.search(&6), Some(&600));
/// assert_eq!(tree.search(&99), None);
/// assert!(tree.counter().read() > 0);
///
/// let keys: Vec<_> = tree.range(6..=12).map(|(k, _)| *k).collect();
/// assert_eq!(keys, vec![6, 7, 10, 12]);
/// ```
pub struct BTree<K, V> {
    root: Node<K, V>,
    config: BTreeConfig,
    counter: Arc<ComparisonCounter>,
    stats: TreeStats,
    len: usize,
    /// Number of internal levels above the leaves (0 when the root is a leaf).
    height: usize,
}

impl<K: Ord + Clone, V> BTree<K, V> {
    /// Create an empty tree of the given order with its own counter.
    ///
    /// # Errors
    /// `Error::InvalidConfiguration` if `order < 3`.
    pub fn new(order: usize) -> Result<Self> {
        Ok(Self::with_config(BTreeConfig::new(order)?))
    }

    /// Create an empty tree from a validated configuration.
    pub fn with_config(config: BTreeConfig) -> Self {
        Self::with_counter(config, Arc::new(ComparisonCounter::new()))
    }

    /// Create an empty tree that records comparisons into `counter`.
    ///
    /// Pass the same counter to several trees to aggregate their
    /// comparisons, or a fresh one to measure a tree in isolation.
    pub fn with_counter(config: BTreeConfig, counter: Arc<ComparisonCounter>) -> Self {
        Self {
            root: Node::empty_leaf(),
            config,
            counter,
            stats: TreeStats::new(),
            len: 0,
            height: 0,
        }
    }

    // ========================================================================
    // Public API: Lookups
    // ========================================================================

    /// Look up the value stored under `key`.
    ///
    /// Absence is a normal outcome and returns `None`.
    pub fn search(&self, key: &K) -> Option<&V> {
        self.root.search(key, &self.counter)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Iterate over entries whose keys fall within `bounds`, in key order.
    ///
    /// The iterator is lazy: it locates the lower bound when created and
    /// checks the upper bound as it goes. Both count as comparisons.
    /// An inverted range yields nothing.
    ///
    /// # Example
    /// ```
    /// use btree_index::BTree;
    ///
    /// let mut tree = BTree::new(3).unwrap();
    /// for key in 0..20 {
    ///     tree.insert(key, ());
    /// }
    /// assert_eq!(tree.range(5..8).count(), 3);
    /// assert_eq!(tree.range(..).count(), 20);
    /// ```
    pub fn range<R: RangeBounds<K>>(&self, bounds: R) -> Range<'_, K, V> {
        Range::new(
            &self.root,
            bounds.start_bound(),
            bounds.end_bound().cloned(),
            &self.counter,
        )
    }

    /// Iterate over every entry in key order.
    pub fn iter(&self) -> Range<'_, K, V> {
        Range::new(&self.root, Bound::Unbounded, Bound::Unbounded, &self.counter)
    }

    /// Iterate over the leaves in key order, one block per leaf.
    pub fn leaves(&self) -> LeafBlocks<'_, K, V> {
        LeafBlocks::new(&self.root)
    }

    /// Smallest entry, found by following the leftmost spine.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let mut node = &self.root;
        loop {
            match node {
                Node::Internal(internal) => node = internal.children.first()?,
                Node::Leaf(leaf) => return leaf.keys.first().zip(leaf.values.first()),
            }
        }
    }

    /// Largest entry, found by following the rightmost spine.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let mut node = &self.root;
        loop {
            match node {
                Node::Internal(internal) => node = internal.children.last()?,
                Node::Leaf(leaf) => return leaf.keys.last().zip(leaf.values.last()),
            }
        }
    }

    // ========================================================================
    // Public API: Mutation
    // ========================================================================

    /// Insert `value` under `key`.
    ///
    /// If `key` is already present its value is replaced, the previous value
    /// is returned and the structure is left untouched.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let ctx = Context {
            config: &self.config,
            counter: &self.counter,
            stats: &self.stats,
        };

        match self.root.insert(key, value, &ctx) {
            Insertion::Replaced(previous) => Some(previous),
            Insertion::Inserted => {
                self.len += 1;
                None
            }
            Insertion::Split(separator, right) => {
                let left = mem::replace(&mut self.root, Node::empty_leaf());
                self.root = Node::Internal(InternalNode {
                    keys: vec![separator],
                    children: vec![left, right],
                });
                self.height += 1;
                self.len += 1;
                TreeStats::record(&self.stats.root_splits);
                trace!(height = self.height, "grew new root");
                None
            }
        }
    }

    /// Remove `key`, returning its value if it was present.
    ///
    /// Removing an absent key leaves the tree unchanged.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let ctx = Context {
            config: &self.config,
            counter: &self.counter,
            stats: &self.stats,
        };

        let removed = self.root.remove(key, &ctx)?;
        self.len -= 1;
        self.collapse_root();
        Some(removed)
    }

    /// Delete `key`. Returns `false` if it was absent.
    pub fn delete(&mut self, key: &K) -> bool {
        self.remove(key).is_some()
    }

    /// Remove every entry. The order and counter are kept.
    pub fn clear(&mut self) {
        self.root = Node::empty_leaf();
        self.len = 0;
        self.height = 0;
    }

    /// Replace an internal root that has a single child with that child.
    fn collapse_root(&mut self) {
        let single_child = matches!(&self.root, Node::Internal(root) if root.children.len() == 1);
        if !single_child {
            return;
        }
        if let Node::Internal(mut root) = mem::replace(&mut self.root, Node::empty_leaf()) {
            if let Some(child) = root.children.pop() {
                self.root = child;
                self.height -= 1;
                TreeStats::record(&self.stats.root_collapses);
                trace!(height = self.height, "collapsed root");
            }
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Check every structural invariant.
    ///
    /// Uses plain `Ord` comparisons, so the comparison counter is untouched.
    pub fn validate(&self) -> std::result::Result<(), InvariantViolation> {
        validate::check(&self.root, &self.config, self.len, self.height)
    }
}

impl<K, V> BTree<K, V> {
    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of internal levels above the leaves.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Maximum number of children per internal node.
    #[inline]
    pub fn order(&self) -> usize {
        self.config.order()
    }

    /// Configuration the tree was built with.
    #[inline]
    pub fn config(&self) -> &BTreeConfig {
        &self.config
    }

    /// The counter this tree records comparisons into.
    #[inline]
    pub fn counter(&self) -> &Arc<ComparisonCounter> {
        &self.counter
    }

    /// Snapshot of split, borrow and merge counts since construction or the
    /// last [`reset_stats`](Self::reset_stats).
    pub fn stats(&self) -> TreeStatsSnapshot {
        self.stats.snapshot()
    }

    /// Zero the structural statistics. The entries and the comparison
    /// counter are untouched.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl<K: Ord + Clone, V> Default for BTree<K, V> {
    fn default() -> Self {
        Self::with_config(BTreeConfig::default())
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for BTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K: Ord + Clone, V> IntoIterator for &'a BTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Range<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Ord + Clone + fmt::Debug, V: fmt::Debug> fmt::Debug for BTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Indented dump: one entry per line, separators in parentheses between
/// the subtrees they divide.
impl<K: fmt::Display, V: fmt::Display> fmt::Display for BTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, &self.root, 0)
    }
}

fn write_node<K: fmt::Display, V: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    node: &Node<K, V>,
    depth: usize,
) -> fmt::Result {
    let indent = INDENT.repeat(depth);
    match node {
        Node::Leaf(leaf) => {
            for (key, value) in leaf.keys.iter().zip(&leaf.values) {
                writeln!(f, "{}{} {}", indent, key, value)?;
            }
        }
        Node::Internal(internal) => {
            for (index, child) in internal.children.iter().enumerate() {
                if index > 0 {
                    writeln!(f, "{}({})", indent, internal.keys[index - 1])?;
                }
                write_node(f, child, depth + 1)?;
            }
        }
    }
    Ok(())
}
