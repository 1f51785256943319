//! btree-index - An order-configurable B+-tree instrumented to count key
//! comparisons.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          btree-index                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Benchmark Harness (bench/)                  │   │
//! │  │   Harness → forks → warmup / measured iterations         │   │
//! │  │   ComparisonCountProfiler → BenchReport (JSON | CSV)     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/)                        │   │
//! │  │     BTree: search | insert | delete | range              │   │
//! │  │     split on overflow, borrow / merge on underflow       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Instrumentation (metrics/)                  │   │
//! │  │        ComparisonCounter + TreeStats (atomic)            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Configuration and error types
//! - [`metrics`] - Comparison counter and structural statistics
//! - [`index`] - The B+-tree
//! - [`bench`] - Benchmark harness, profilers and result files
//!
//! # Quick Start
//! ```
//! use std::sync::Arc;
//! use btree_index::{BTree, BTreeConfig, ComparisonCounter};
//!
//! let counter = Arc::new(ComparisonCounter::new());
//! let mut tree = BTree::with_counter(BTreeConfig::new(4).unwrap(), Arc::clone(&counter));
//!
//! tree.insert(1, "one");
//! tree.insert(2, "two");
//!
//! counter.reset();
//! assert_eq!(tree.search(&2), Some(&"two"));
//! assert!(counter.read() > 0);
//! ```

pub mod bench;
pub mod common;
pub mod index;
pub mod metrics;

// Re-export commonly used items at crate root for convenience
pub use common::{BTreeConfig, Error, Result, DEFAULT_ORDER, MIN_ORDER};
pub use index::{BTree, InvariantViolation, Range};
pub use metrics::{ComparisonCounter, TreeStats, TreeStatsSnapshot};
