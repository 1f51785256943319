//! Node representation and the recursive insert/remove algorithms.
//!
//! Nodes own their children outright. Structural changes travel upward by
//! return value: an overflowing child hands its parent a separator and a new
//! right sibling, and an underflowing child is repaired by its parent right
//! after the recursive call returns.

use std::cmp::Ordering;
use std::mem;

use tracing::trace;

use crate::common::BTreeConfig;
use crate::metrics::{ComparisonCounter, TreeStats};

/// A tree node: either a leaf holding entries or an internal node holding
/// separators and children.
#[derive(Debug, Clone)]
pub(crate) enum Node<K, V> {
    Leaf(LeafNode<K, V>),
    Internal(InternalNode<K, V>),
}

/// Ordered entries stored as parallel key and value vectors.
#[derive(Debug, Clone)]
pub(crate) struct LeafNode<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
}

/// Separators and children, with `children.len() == keys.len() + 1`.
///
/// `keys[i]` is a copy of the smallest key reachable through
/// `children[i + 1]` at the time it was promoted.
#[derive(Debug, Clone)]
pub(crate) struct InternalNode<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) children: Vec<Node<K, V>>,
}

/// Everything an operation needs besides the nodes themselves.
pub(crate) struct Context<'a> {
    pub(crate) config: &'a BTreeConfig,
    pub(crate) counter: &'a ComparisonCounter,
    pub(crate) stats: &'a TreeStats,
}

/// Result of inserting into a subtree.
pub(crate) enum Insertion<K, V> {
    /// New key, the subtree absorbed it.
    Inserted,
    /// Existing key, this is the previous value.
    Replaced(V),
    /// New key, the subtree overflowed and split. The parent must add the
    /// separator followed by the new right sibling.
    Split(K, Node<K, V>),
}

// ============================================================================
// Counted search
// ============================================================================

/// Binary search for `key` in `keys`, counting every probe.
///
/// Returns `Ok(index)` on a match, or `Err(index)` with the insertion point.
pub(crate) fn search_keys<K: Ord>(
    keys: &[K],
    key: &K,
    counter: &ComparisonCounter,
) -> Result<usize, usize> {
    let mut low = 0;
    let mut high = keys.len();
    while low < high {
        let mid = low + (high - low) / 2;
        match counter.compare(&keys[mid], key) {
            Ordering::Less => low = mid + 1,
            Ordering::Greater => high = mid,
            Ordering::Equal => return Ok(mid),
        }
    }
    Err(low)
}

/// Index of the child whose subtree may contain `key`.
///
/// A key equal to a separator routes to the right child.
#[inline]
pub(crate) fn child_index<K: Ord>(keys: &[K], key: &K, counter: &ComparisonCounter) -> usize {
    match search_keys(keys, key, counter) {
        Ok(index) => index + 1,
        Err(index) => index,
    }
}

// ============================================================================
// Node
// ============================================================================

impl<K, V> Node<K, V> {
    pub(crate) fn empty_leaf() -> Self {
        Node::Leaf(LeafNode {
            keys: Vec::new(),
            values: Vec::new(),
        })
    }

    /// Number of keys: entries for a leaf, separators for an internal node.
    #[inline]
    pub(crate) fn key_count(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.keys.len(),
            Node::Internal(internal) => internal.keys.len(),
        }
    }
}

impl<K: Ord + Clone, V> Node<K, V> {
    /// Find the value stored under `key` in this subtree.
    pub(crate) fn search(&self, key: &K, counter: &ComparisonCounter) -> Option<&V> {
        let mut node = self;
        loop {
            match node {
                Node::Internal(internal) => {
                    node = &internal.children[child_index(&internal.keys, key, counter)];
                }
                Node::Leaf(leaf) => {
                    return search_keys(&leaf.keys, key, counter)
                        .ok()
                        .map(|index| &leaf.values[index]);
                }
            }
        }
    }

    /// Insert `key` into this subtree.
    pub(crate) fn insert(&mut self, key: K, value: V, ctx: &Context<'_>) -> Insertion<K, V> {
        match self {
            Node::Leaf(leaf) => leaf.insert(key, value, ctx),
            Node::Internal(internal) => internal.insert(key, value, ctx),
        }
    }

    /// Remove `key` from this subtree, returning its value.
    ///
    /// Children left underfull are repaired before returning; only this node
    /// itself may be underfull afterwards, and its parent repairs it.
    pub(crate) fn remove(&mut self, key: &K, ctx: &Context<'_>) -> Option<V> {
        match self {
            Node::Leaf(leaf) => {
                let index = search_keys(&leaf.keys, key, ctx.counter).ok()?;
                leaf.keys.remove(index);
                Some(leaf.values.remove(index))
            }
            Node::Internal(internal) => {
                let index = child_index(&internal.keys, key, ctx.counter);
                let removed = internal.children[index].remove(key, ctx)?;
                if internal.children[index].key_count() < ctx.config.min_keys() {
                    internal.rebalance_child(index, ctx);
                }
                Some(removed)
            }
        }
    }
}

// ============================================================================
// Leaf
// ============================================================================

impl<K: Ord + Clone, V> LeafNode<K, V> {
    fn insert(&mut self, key: K, value: V, ctx: &Context<'_>) -> Insertion<K, V> {
        match search_keys(&self.keys, &key, ctx.counter) {
            Ok(index) => Insertion::Replaced(mem::replace(&mut self.values[index], value)),
            Err(index) => {
                self.keys.insert(index, key);
                self.values.insert(index, value);
                if self.keys.len() > ctx.config.max_leaf_entries() {
                    let (separator, right) = self.split();
                    TreeStats::record(&ctx.stats.leaf_splits);
                    trace!(
                        left = self.keys.len(),
                        right = right.keys.len(),
                        "split leaf"
                    );
                    Insertion::Split(separator, Node::Leaf(right))
                } else {
                    Insertion::Inserted
                }
            }
        }
    }

    /// Move the upper half into a new leaf. The left half keeps `len / 2`.
    fn split(&mut self) -> (K, LeafNode<K, V>) {
        let mid = self.keys.len() / 2;
        let right = LeafNode {
            keys: self.keys.split_off(mid),
            values: self.values.split_off(mid),
        };
        (right.keys[0].clone(), right)
    }
}

// ============================================================================
// Internal
// ============================================================================

impl<K: Ord + Clone, V> InternalNode<K, V> {
    fn insert(&mut self, key: K, value: V, ctx: &Context<'_>) -> Insertion<K, V> {
        let index = child_index(&self.keys, &key, ctx.counter);
        match self.children[index].insert(key, value, ctx) {
            Insertion::Split(separator, right) => {
                self.keys.insert(index, separator);
                self.children.insert(index + 1, right);
                if self.children.len() > ctx.config.order() {
                    let (separator, right) = self.split();
                    TreeStats::record(&ctx.stats.internal_splits);
                    trace!(
                        left = self.children.len(),
                        right = right.children.len(),
                        "split internal node"
                    );
                    Insertion::Split(separator, Node::Internal(right))
                } else {
                    Insertion::Inserted
                }
            }
            other => other,
        }
    }

    /// Move the upper children into a new node and return the median
    /// separator, which moves up rather than being copied.
    fn split(&mut self) -> (K, InternalNode<K, V>) {
        let left_children = self.children.len().div_ceil(2);
        let children = self.children.split_off(left_children);
        let keys = self.keys.split_off(left_children);
        // keys.len() == left_children here, the last one is the median
        let separator = self
            .keys
            .pop()
            .unwrap_or_else(|| unreachable!("internal split with no separators"));
        (separator, InternalNode { keys, children })
    }

    /// Restore minimum occupancy of `children[index]`.
    ///
    /// Borrows from the right sibling, then the left one; merges when
    /// neither has a key to spare.
    fn rebalance_child(&mut self, index: usize, ctx: &Context<'_>) {
        let min_keys = ctx.config.min_keys();
        let has_right = index + 1 < self.children.len();

        if has_right && self.children[index + 1].key_count() > min_keys {
            self.borrow_from_right(index);
            TreeStats::record(&ctx.stats.borrows);
            trace!(child = index, "borrowed from right sibling");
        } else if index > 0 && self.children[index - 1].key_count() > min_keys {
            self.borrow_from_left(index);
            TreeStats::record(&ctx.stats.borrows);
            trace!(child = index, "borrowed from left sibling");
        } else if index > 0 {
            self.merge_children(index - 1);
            TreeStats::record(&ctx.stats.merges);
            trace!(left = index - 1, right = index, "merged with left sibling");
        } else {
            self.merge_children(index);
            TreeStats::record(&ctx.stats.merges);
            trace!(left = index, right = index + 1, "merged with right sibling");
        }
    }

    fn borrow_from_right(&mut self, index: usize) {
        let separator = &mut self.keys[index];
        let (head, tail) = self.children.split_at_mut(index + 1);
        match (&mut head[index], &mut tail[0]) {
            (Node::Leaf(child), Node::Leaf(right)) => {
                child.keys.push(right.keys.remove(0));
                child.values.push(right.values.remove(0));
                *separator = right.keys[0].clone();
            }
            (Node::Internal(child), Node::Internal(right)) => {
                let demoted = mem::replace(separator, right.keys.remove(0));
                child.keys.push(demoted);
                child.children.push(right.children.remove(0));
            }
            _ => unreachable!("siblings at different depths"),
        }
    }

    fn borrow_from_left(&mut self, index: usize) {
        let separator = &mut self.keys[index - 1];
        let (head, tail) = self.children.split_at_mut(index);
        match (&mut head[index - 1], &mut tail[0]) {
            (Node::Leaf(left), Node::Leaf(child)) => {
                if let (Some(key), Some(value)) = (left.keys.pop(), left.values.pop()) {
                    *separator = key.clone();
                    child.keys.insert(0, key);
                    child.values.insert(0, value);
                }
            }
            (Node::Internal(left), Node::Internal(child)) => {
                if let (Some(key), Some(node)) = (left.keys.pop(), left.children.pop()) {
                    let demoted = mem::replace(separator, key);
                    child.keys.insert(0, demoted);
                    child.children.insert(0, node);
                }
            }
            _ => unreachable!("siblings at different depths"),
        }
    }

    /// Fold `children[left + 1]` into `children[left]` and drop the
    /// separator between them.
    fn merge_children(&mut self, left: usize) {
        let separator = self.keys.remove(left);
        let right = self.children.remove(left + 1);
        match (&mut self.children[left], right) {
            (Node::Leaf(node), Node::Leaf(right)) => {
                node.keys.extend(right.keys);
                node.values.extend(right.values);
            }
            (Node::Internal(node), Node::Internal(right)) => {
                node.keys.push(separator);
                node.keys.extend(right.keys);
                node.children.extend(right.children);
            }
            _ => unreachable!("siblings at different depths"),
        }
    }
}
