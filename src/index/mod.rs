//! Index structures.
//!
//! - [`btree`] - Order-configurable B+-tree with comparison counting

pub mod btree;

pub use btree::{BTree, InvariantViolation, LeafBlock, LeafBlocks, Range};
