//! Structural invariant checks.

use thiserror::Error;

use super::node::Node;
use crate::common::BTreeConfig;

/// A broken structural invariant, reported by
/// [`BTree::validate`](super::BTree::validate).
///
/// Any of these means the tree is corrupt; none is reachable through the
/// public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("leaves found at depths {expected} and {found}")]
    UnbalancedLeaves { expected: usize, found: usize },

    #[error("tree reports height {reported} but its leaves are at depth {actual}")]
    HeightMismatch { reported: usize, actual: usize },

    #[error("tree reports {reported} entries but holds {actual}")]
    LengthMismatch { reported: usize, actual: usize },

    #[error("node at depth {depth} holds {keys} keys, outside {min}..={max}")]
    Occupancy {
        depth: usize,
        keys: usize,
        min: usize,
        max: usize,
    },

    #[error("node at depth {depth} has {keys} keys but {slots} children or values")]
    Shape {
        depth: usize,
        keys: usize,
        slots: usize,
    },

    #[error("keys out of order in a node at depth {depth}")]
    Unordered { depth: usize },

    #[error("key outside its separator bounds at depth {depth}")]
    OutOfBounds { depth: usize },
}

type Check<T> = std::result::Result<T, InvariantViolation>;

struct Checker<'a> {
    config: &'a BTreeConfig,
    leaf_depth: Option<usize>,
}

/// Walk the whole tree and verify every invariant.
pub(crate) fn check<K: Ord, V>(
    root: &Node<K, V>,
    config: &BTreeConfig,
    len: usize,
    height: usize,
) -> Check<()> {
    let mut checker = Checker {
        config,
        leaf_depth: None,
    };
    let actual = checker.node(root, 0, None, None)?;

    if actual != len {
        return Err(InvariantViolation::LengthMismatch {
            reported: len,
            actual,
        });
    }
    let depth = checker.leaf_depth.unwrap_or(0);
    if depth != height {
        return Err(InvariantViolation::HeightMismatch {
            reported: height,
            actual: depth,
        });
    }
    Ok(())
}

impl Checker<'_> {
    /// Check the subtree at `node`, whose keys must lie in `[lower, upper)`.
    /// Returns the number of entries it holds.
    fn node<K: Ord, V>(
        &mut self,
        node: &Node<K, V>,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
    ) -> Check<usize> {
        let is_root = depth == 0;
        let max = self.config.order() - 1;

        match node {
            Node::Leaf(leaf) => {
                let min = if is_root { 0 } else { self.config.min_keys() };
                occupancy(depth, leaf.keys.len(), min, max)?;
                if leaf.values.len() != leaf.keys.len() {
                    return Err(InvariantViolation::Shape {
                        depth,
                        keys: leaf.keys.len(),
                        slots: leaf.values.len(),
                    });
                }
                ordered(&leaf.keys, depth, lower, upper)?;

                match self.leaf_depth {
                    None => self.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(InvariantViolation::UnbalancedLeaves {
                            expected,
                            found: depth,
                        });
                    }
                    Some(_) => {}
                }
                Ok(leaf.keys.len())
            }
            Node::Internal(internal) => {
                // an internal root still needs two children
                let min = if is_root { 1 } else { self.config.min_keys() };
                occupancy(depth, internal.keys.len(), min, max)?;
                if internal.children.len() != internal.keys.len() + 1 {
                    return Err(InvariantViolation::Shape {
                        depth,
                        keys: internal.keys.len(),
                        slots: internal.children.len(),
                    });
                }
                ordered(&internal.keys, depth, lower, upper)?;

                let mut entries = 0;
                for (index, child) in internal.children.iter().enumerate() {
                    let child_lower = if index == 0 {
                        lower
                    } else {
                        Some(&internal.keys[index - 1])
                    };
                    let child_upper = internal.keys.get(index).or(upper);
                    entries += self.node(child, depth + 1, child_lower, child_upper)?;
                }
                Ok(entries)
            }
        }
    }
}

fn occupancy(depth: usize, keys: usize, min: usize, max: usize) -> Check<()> {
    if keys < min || keys > max {
        return Err(InvariantViolation::Occupancy {
            depth,
            keys,
            min,
            max,
        });
    }
    Ok(())
}

fn ordered<K: Ord>(keys: &[K], depth: usize, lower: Option<&K>, upper: Option<&K>) -> Check<()> {
    if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(InvariantViolation::Unordered { depth });
    }
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return Ok(());
    };
    if lower.is_some_and(|lower| first < lower) || upper.is_some_and(|upper| last >= upper) {
        return Err(InvariantViolation::OutOfBounds { depth });
    }
    Ok(())
}
