//! Profiler hooks run around every measured iteration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::metrics::ComparisonCounter;

/// What a profiler can see about the iteration being measured.
pub struct IterationContext<'a> {
    pub benchmark: &'a str,
    pub fork: usize,
    pub iteration: usize,
    /// Counter attached to this fork's state.
    pub counter: &'a ComparisonCounter,
}

/// Work done by one measured iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationOutcome {
    pub operations: u64,
    pub elapsed: Duration,
}

/// An extra metric reported next to the primary score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryResult {
    pub label: String,
    pub score: f64,
    pub unit: String,
}

impl SecondaryResult {
    pub fn new(label: impl Into<String>, score: f64, unit: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            score,
            unit: unit.into(),
        }
    }
}

/// Hook invoked by the [`Harness`](super::Harness) around measured
/// iterations. Warmup iterations are not profiled.
pub trait Profiler: Send + Sync {
    /// One-line summary of what the profiler records.
    fn description(&self) -> &str;

    /// Called after per-iteration setup, right before timing starts.
    fn before_iteration(&self, ctx: &IterationContext<'_>);

    /// Called right after timing stops.
    fn after_iteration(
        &self,
        ctx: &IterationContext<'_>,
        outcome: &IterationOutcome,
    ) -> Vec<SecondaryResult>;
}

/// Reports how many key comparisons each measured iteration performed.
///
/// Resets the fork's counter before the iteration, reads it afterwards and
/// resets it again so nothing done between iterations is attributed to the
/// next one.
#[derive(Debug, Default, Clone, Copy)]
pub struct ComparisonCountProfiler;

impl ComparisonCountProfiler {
    pub const LABEL: &'static str = "Comparisons";
    pub const PER_OP_LABEL: &'static str = "Comparisons/op";
}

impl Profiler for ComparisonCountProfiler {
    fn description(&self) -> &str {
        "Counts key comparisons performed by the index"
    }

    fn before_iteration(&self, ctx: &IterationContext<'_>) {
        ctx.counter.reset();
    }

    fn after_iteration(
        &self,
        ctx: &IterationContext<'_>,
        outcome: &IterationOutcome,
    ) -> Vec<SecondaryResult> {
        let count = ctx.counter.read();
        ctx.counter.reset();

        let per_op = if outcome.operations == 0 {
            0.0
        } else {
            count as f64 / outcome.operations as f64
        };
        vec![
            SecondaryResult::new(Self::LABEL, count as f64, "inv/it"),
            SecondaryResult::new(Self::PER_OP_LABEL, per_op, "inv/op"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(counter: &ComparisonCounter) -> IterationContext<'_> {
        IterationContext {
            benchmark: "search",
            fork: 0,
            iteration: 0,
            counter,
        }
    }

    #[test]
    fn test_profiler_resets_before_iteration() {
        let counter = ComparisonCounter::new();
        counter.add(99);

        ComparisonCountProfiler.before_iteration(&context(&counter));
        assert_eq!(counter.read(), 0);
    }

    #[test]
    fn test_profiler_reports_and_resets_after_iteration() {
        let counter = ComparisonCounter::new();
        let profiler = ComparisonCountProfiler;
        let ctx = context(&counter);

        profiler.before_iteration(&ctx);
        counter.add(50);
        let outcome = IterationOutcome {
            operations: 10,
            elapsed: Duration::from_millis(1),
        };
        let results = profiler.after_iteration(&ctx, &outcome);

        assert_eq!(
            results,
            vec![
                SecondaryResult::new("Comparisons", 50.0, "inv/it"),
                SecondaryResult::new("Comparisons/op", 5.0, "inv/op"),
            ]
        );
        assert_eq!(counter.read(), 0);
    }
}
