//! Ordered iterators over a [`BTree`](super::BTree).
//!
//! Leaves are not linked to each other, so the iterators keep an explicit
//! stack of the internal nodes on the path to the current leaf.

use std::cmp::Ordering;
use std::iter::FusedIterator;
use std::ops::Bound;

use super::node::{child_index, search_keys, InternalNode, LeafNode, Node};
use crate::metrics::ComparisonCounter;

/// A lazy, ordered iterator over the entries of a key range.
///
/// Created by [`BTree::range`](super::BTree::range) and
/// [`BTree::iter`](super::BTree::iter). Each upper-bound check is one
/// counted comparison. Cloning gives an independent cursor at the same
/// position.
pub struct Range<'a, K, V> {
    /// Internal nodes on the path to `leaf`, each with the index of the next
    /// child to visit.
    stack: Vec<(&'a InternalNode<K, V>, usize)>,
    leaf: Option<&'a LeafNode<K, V>>,
    position: usize,
    end: Bound<K>,
    counter: &'a ComparisonCounter,
}

impl<'a, K: Ord, V> Range<'a, K, V> {
    pub(crate) fn new(
        root: &'a Node<K, V>,
        start: Bound<&K>,
        end: Bound<K>,
        counter: &'a ComparisonCounter,
    ) -> Self {
        let mut stack = Vec::new();
        let mut node = root;
        loop {
            match node {
                Node::Internal(internal) => {
                    let index = match start {
                        Bound::Included(key) | Bound::Excluded(key) => {
                            child_index(&internal.keys, key, counter)
                        }
                        Bound::Unbounded => 0,
                    };
                    stack.push((internal, index + 1));
                    node = &internal.children[index];
                }
                Node::Leaf(leaf) => {
                    let position = match start {
                        Bound::Included(key) => match search_keys(&leaf.keys, key, counter) {
                            Ok(index) | Err(index) => index,
                        },
                        Bound::Excluded(key) => match search_keys(&leaf.keys, key, counter) {
                            Ok(index) => index + 1,
                            Err(index) => index,
                        },
                        Bound::Unbounded => 0,
                    };
                    return Self {
                        stack,
                        leaf: Some(leaf),
                        position,
                        end,
                        counter,
                    };
                }
            }
        }
    }

    fn below_end(&self, key: &K) -> bool {
        match &self.end {
            Bound::Included(end) => self.counter.compare(key, end) != Ordering::Greater,
            Bound::Excluded(end) => self.counter.compare(key, end) == Ordering::Less,
            Bound::Unbounded => true,
        }
    }

    /// Advance to the leftmost leaf of the next unvisited subtree.
    fn next_leaf(&mut self) -> Option<&'a LeafNode<K, V>> {
        while let Some((internal, next)) = self.stack.pop() {
            if next < internal.children.len() {
                self.stack.push((internal, next + 1));
                return Some(self.descend_leftmost(&internal.children[next]));
            }
        }
        None
    }

    fn descend_leftmost(&mut self, mut node: &'a Node<K, V>) -> &'a LeafNode<K, V> {
        loop {
            match node {
                Node::Internal(internal) => {
                    self.stack.push((internal, 1));
                    node = &internal.children[0];
                }
                Node::Leaf(leaf) => return leaf,
            }
        }
    }

    fn finish(&mut self) {
        self.leaf = None;
        self.stack.clear();
    }
}

impl<'a, K: Ord, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let leaf = self.leaf?;
            if self.position < leaf.keys.len() {
                let key = &leaf.keys[self.position];
                if !self.below_end(key) {
                    self.finish();
                    return None;
                }
                let value = &leaf.values[self.position];
                self.position += 1;
                return Some((key, value));
            }
            self.leaf = self.next_leaf();
            self.position = 0;
        }
    }
}

impl<K: Ord, V> FusedIterator for Range<'_, K, V> {}

impl<K: Clone, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            leaf: self.leaf,
            position: self.position,
            end: self.end.clone(),
            counter: self.counter,
        }
    }
}

/// The entries of one leaf, in key order.
#[derive(Debug)]
pub struct LeafBlock<'a, K, V> {
    keys: &'a [K],
    values: &'a [V],
}

impl<'a, K, V> LeafBlock<'a, K, V> {
    pub fn keys(&self) -> &'a [K] {
        self.keys
    }

    pub fn values(&self) -> &'a [V] {
        self.values
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a K, &'a V)> + 'a {
        self.keys.iter().zip(self.values)
    }
}

/// Iterator over the non-empty leaves of a tree, left to right.
///
/// Created by [`BTree::leaves`](super::BTree::leaves). Performs no key
/// comparisons.
pub struct LeafBlocks<'a, K, V> {
    pending: Vec<&'a Node<K, V>>,
}

impl<'a, K, V> LeafBlocks<'a, K, V> {
    pub(crate) fn new(root: &'a Node<K, V>) -> Self {
        Self {
            pending: vec![root],
        }
    }
}

impl<'a, K, V> Iterator for LeafBlocks<'a, K, V> {
    type Item = LeafBlock<'a, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.pending.pop() {
            match node {
                Node::Leaf(leaf) if !leaf.keys.is_empty() => {
                    return Some(LeafBlock {
                        keys: &leaf.keys,
                        values: &leaf.values,
                    });
                }
                Node::Leaf(_) => {}
                Node::Internal(internal) => self.pending.extend(internal.children.iter().rev()),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::index::BTree;

    fn tree(order: usize, count: i32) -> BTree<i32, i32> {
        let mut tree = BTree::new(order).unwrap();
        for key in 0..count {
            tree.insert(key * 2, key);
        }
        tree
    }

    fn keys<'a>(iter: impl Iterator<Item = (&'a i32, &'a i32)>) -> Vec<i32> {
        iter.map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_full_scan_is_ordered() {
        let tree = tree(3, 50);
        let all = keys(tree.iter());
        assert_eq!(all.len(), 50);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_inclusive_bounds() {
        let tree = tree(4, 50);
        assert_eq!(keys(tree.range(10..=16)), vec![10, 12, 14, 16]);
        // bounds that are not keys
        assert_eq!(keys(tree.range(11..=17)), vec![12, 14, 16]);
    }

    #[test]
    fn test_exclusive_bounds() {
        let tree = tree(4, 50);
        assert_eq!(keys(tree.range(10..16)), vec![10, 12, 14]);

        let excluded_start = (std::ops::Bound::Excluded(10), std::ops::Bound::Included(16));
        assert_eq!(keys(tree.range(excluded_start)), vec![12, 14, 16]);
    }

    #[test]
    fn test_open_ended_ranges() {
        let tree = tree(5, 20);
        assert_eq!(keys(tree.range(..6)), vec![0, 2, 4]);
        assert_eq!(keys(tree.range(34..)), vec![34, 36, 38]);
    }

    #[test]
    fn test_empty_and_inverted_ranges() {
        let tree = tree(4, 20);
        assert_eq!(tree.range(100..200).count(), 0);
        assert_eq!(tree.range(11..12).count(), 0);
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = tree.range(20..=10).count();
        assert_eq!(inverted, 0);
    }

    #[test]
    fn test_range_counts_boundary_comparisons() {
        let tree = tree(4, 50);
        tree.counter().reset();

        let found = tree.range(10..=16).count();
        assert_eq!(found, 4);
        // four upper-bound checks that pass plus the one that stops the scan,
        // on top of the descent
        assert!(tree.counter().read() >= 5);

        tree.counter().reset();
        assert_eq!(tree.range(..).count(), 50);
        assert_eq!(tree.counter().read(), 0);
    }

    #[test]
    fn test_clone_restarts_independently() {
        let tree = tree(3, 10);
        let mut range = tree.range(4..);
        range.next();

        let copy = range.clone();
        assert_eq!(keys(range), keys(copy));
        assert_eq!(keys(tree.range(4..)).len(), 8);
    }

    #[test]
    fn test_fused_after_end() {
        let tree = tree(3, 10);
        let mut range = tree.range(..=2);
        assert_eq!(range.next(), Some((&0, &0)));
        assert_eq!(range.next(), Some((&2, &1)));
        assert_eq!(range.next(), None);
        assert_eq!(range.next(), None);
    }

    #[test]
    fn test_leaf_blocks_cover_all_entries_in_order() {
        let tree = tree(4, 30);
        let blocks: Vec<_> = tree.leaves().collect();
        assert!(blocks.len() > 1);

        let flattened: Vec<i32> = blocks.iter().flat_map(|b| b.keys().to_vec()).collect();
        assert_eq!(flattened, keys(tree.iter()));
        assert!(blocks.iter().all(|b| !b.is_empty() && b.len() <= 3));
    }

    #[test]
    fn test_leaf_block_pairs_keys_with_values() {
        let tree = tree(5, 12);
        for block in tree.leaves() {
            let pairs: Vec<(&i32, &i32)> = block.iter().collect();
            assert_eq!(pairs.len(), block.values().len());
            assert!(pairs.iter().all(|(key, value)| **value * 2 == **key));
        }
        let values: Vec<i32> = tree.leaves().flat_map(|b| b.values().to_vec()).collect();
        assert_eq!(values, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_leaf_blocks_of_empty_tree() {
        let tree: BTree<i32, i32> = BTree::new(4).unwrap();
        assert_eq!(tree.leaves().count(), 0);
    }
}
