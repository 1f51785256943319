//! Configuration for the B+-tree index.

use crate::common::{Error, Result};

/// Smallest order a tree may be built with.
///
/// With fewer than three children per internal node a split could not leave
/// both halves at the minimum occupancy.
pub const MIN_ORDER: usize = 3;

/// Order used by [`BTreeConfig::default`].
pub const DEFAULT_ORDER: usize = 32;

/// Construction-time configuration of a [`BTree`](crate::index::BTree).
///
/// The order `m` is the maximum number of children of an internal node.
/// Every other occupancy bound is derived from it:
///
/// | Node            | Minimum            | Maximum      |
/// |-----------------|--------------------|--------------|
/// | internal (keys) | `ceil(m/2) - 1`    | `m - 1`      |
/// | leaf (entries)  | `ceil(m/2) - 1`    | `m - 1`      |
/// | root            | no minimum         | same maximum |
///
/// # Example
/// ```
/// use btree_index::BTreeConfig;
///
/// let config = BTreeConfig::new(4).unwrap();
/// assert_eq!(config.order(), 4);
/// assert_eq!(config.min_keys(), 1);
/// assert_eq!(config.max_leaf_entries(), 3);
///
/// assert!(BTreeConfig::new(2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeConfig {
    order: usize,
}

impl BTreeConfig {
    /// Create a configuration with the given order.
    ///
    /// # Errors
    /// `Error::InvalidConfiguration` if `order < MIN_ORDER`.
    pub fn new(order: usize) -> Result<Self> {
        if order < MIN_ORDER {
            return Err(Error::InvalidConfiguration(format!(
                "order must be at least {}, got {}",
                MIN_ORDER, order
            )));
        }
        Ok(Self { order })
    }

    /// Maximum number of children of an internal node.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Minimum number of children of a non-root internal node.
    #[inline]
    pub fn min_children(&self) -> usize {
        self.order.div_ceil(2)
    }

    /// Minimum number of keys in a non-root node (leaf or internal).
    #[inline]
    pub fn min_keys(&self) -> usize {
        self.min_children() - 1
    }

    /// Maximum number of entries a leaf holds after an operation completes.
    #[inline]
    pub fn max_leaf_entries(&self) -> usize {
        self.order - 1
    }
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
        }
    }
}
