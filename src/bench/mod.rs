//! In-process benchmark harness.
//!
//! Runs benchmarks in isolated forks with warmup and measured iterations,
//! lets [`Profiler`]s observe each measured iteration, and writes the
//! results as JSON or CSV.
//!
//! # Components
//! - [`BenchOptions`] - Forks, iteration counts, budgets, output format
//! - [`Harness`] / [`Benchmark`] - The runner and what it runs
//! - [`ComparisonCountProfiler`] - Reads and resets the comparison counter
//! - [`BenchReport`] - Collected records and their encodings
//! - [`suite`] - The standard search / insert / delete / range benchmarks
//! - [`workload`] - Deterministic key samples

mod harness;
mod options;
mod profiler;
mod report;
pub mod suite;
pub mod workload;

pub use harness::{Benchmark, FnBenchmark, ForkContext, Harness};
pub use options::{BenchOptions, IterationBudget, Mode, ResultFormat, DEFAULT_RESULTS_DIR};
pub use profiler::{
    ComparisonCountProfiler, IterationContext, IterationOutcome, Profiler, SecondaryResult,
};
pub use report::{BenchReport, IterationRecord};
