//! B+-tree index.
//!
//! # Layout
//! ```text
//!                    ┌───────────────┐
//!                    │   [10 | 20]   │   internal: separators + children
//!                    └───┬───┬───┬───┘
//!           ┌────────────┘   │   └────────────┐
//!     ┌─────▼─────┐    ┌─────▼─────┐    ┌─────▼─────┐
//!     │  5  6  7  │    │ 10 12 17  │    │  20  30   │   leaves: entries
//!     └───────────┘    └───────────┘    └───────────┘
//! ```
//!
//! - Values are stored only in leaves; a separator is a copy of the first
//!   key of the subtree to its right. Keys equal to a separator go right.
//! - Nodes own their children. There are no parent pointers and no sibling
//!   links: splits are returned to the caller, underflows are repaired by
//!   the parent after the recursive call returns.
//! - Every key comparison goes through the tree's
//!   [`ComparisonCounter`](crate::metrics::ComparisonCounter).

mod iter;
mod node;
mod tree;
mod validate;

pub use iter::{LeafBlock, LeafBlocks, Range};
pub use tree::BTree;
pub use validate::InvariantViolation;
