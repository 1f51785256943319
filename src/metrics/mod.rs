//! Instrumentation consumed by the benchmark harness.
//!
//! # Components
//! - [`ComparisonCounter`] - Counts key comparisons made by index operations
//! - [`TreeStats`] - Split, borrow and merge counters

mod comparison;
mod stats;

pub use comparison::ComparisonCounter;
pub use stats::{TreeStats, TreeStatsSnapshot};
