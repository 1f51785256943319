//! The benchmark runner.
//!
//! # Run structure
//! ```text
//! for each fork (own state, own ComparisonCounter):
//!     setup
//!     warmup iterations:    prepare_iteration → operation × budget
//!     measured iterations:  prepare_iteration → before_iteration
//!                           → operation × budget → after_iteration → record
//! ```

use std::collections::BTreeMap;
use std::hint::black_box;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::{debug, info};

use super::options::{BenchOptions, IterationBudget};
use super::profiler::{ComparisonCountProfiler, IterationContext, IterationOutcome, Profiler};
use super::report::IterationRecord;
use crate::common::Result;
use crate::metrics::ComparisonCounter;

/// Per-fork inputs handed to [`Benchmark::setup`].
pub struct ForkContext {
    pub fork: usize,
    /// Attach this counter to every tree the fork builds.
    pub counter: Arc<ComparisonCounter>,
}

/// A unit of work the harness can measure.
///
/// State is built once per fork and never shared between forks, so forks
/// may run on different threads without any locking of the state.
pub trait Benchmark: Sync {
    type State;

    fn name(&self) -> &str;

    /// Parameters identifying this variant, copied into every record.
    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// Build the fork's state. Not measured.
    fn setup(&self, fork: &ForkContext) -> Self::State;

    /// Reset state before each iteration. Not measured, not profiled.
    fn prepare_iteration(&self, _state: &mut Self::State) {}

    /// Fixed number of operations per iteration, overriding the options'
    /// warmup and measurement budgets.
    ///
    /// Benchmarks that consume their state (one insert or delete per sampled
    /// key) return the sample size so an iteration never runs past it.
    fn batch_size(&self) -> Option<u64> {
        None
    }

    /// The measured operation.
    fn operation(&self, state: &mut Self::State);
}

/// A [`Benchmark`] built from a setup closure and an operation closure.
///
/// # Example
/// ```
/// use btree_index::bench::{BenchOptions, FnBenchmark, Harness};
/// use btree_index::{BTree, BTreeConfig};
///
/// let harness = Harness::new(BenchOptions::quick()).unwrap();
/// let bench = FnBenchmark::new(
///     "search",
///     |fork| {
///         let mut tree = BTree::with_counter(BTreeConfig::new(8).unwrap(), fork.counter.clone());
///         tree.extend((0..100).map(|k| (k, k)));
///         tree
///     },
///     |tree| {
///         tree.search(&42);
///     },
/// );
/// let records = harness.run(&bench);
/// assert_eq!(records.len(), 3);
/// ```
pub struct FnBenchmark<S, Setup, Op> {
    name: String,
    setup: Setup,
    op: Op,
    _state: PhantomData<fn() -> S>,
}

impl<S, Setup, Op> FnBenchmark<S, Setup, Op>
where
    Setup: Fn(&ForkContext) -> S + Sync,
    Op: Fn(&mut S) + Sync,
{
    pub fn new(name: impl Into<String>, setup: Setup, op: Op) -> Self {
        Self {
            name: name.into(),
            setup,
            op,
            _state: PhantomData,
        }
    }
}

impl<S, Setup, Op> Benchmark for FnBenchmark<S, Setup, Op>
where
    Setup: Fn(&ForkContext) -> S + Sync,
    Op: Fn(&mut S) + Sync,
{
    type State = S;

    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&self, fork: &ForkContext) -> S {
        (self.setup)(fork)
    }

    fn operation(&self, state: &mut S) {
        (self.op)(state)
    }
}

/// Runs benchmarks according to [`BenchOptions`] and collects records.
pub struct Harness {
    options: BenchOptions,
    profilers: Vec<Box<dyn Profiler>>,
}

impl Harness {
    /// Create a harness, attaching the comparison-count profiler if the
    /// options ask for it.
    ///
    /// # Errors
    /// `Error::InvalidConfiguration` if the options are unusable.
    pub fn new(options: BenchOptions) -> Result<Self> {
        options.validate()?;
        let mut profilers: Vec<Box<dyn Profiler>> = Vec::new();
        if options.profile_comparisons {
            profilers.push(Box::new(ComparisonCountProfiler));
        }
        Ok(Self { options, profilers })
    }

    /// Attach an additional profiler.
    pub fn with_profiler(mut self, profiler: impl Profiler + 'static) -> Self {
        self.profilers.push(Box::new(profiler));
        self
    }

    pub fn options(&self) -> &BenchOptions {
        &self.options
    }

    /// Descriptions of the attached profilers.
    pub fn profilers(&self) -> Vec<&str> {
        self.profilers.iter().map(|p| p.description()).collect()
    }

    /// Run every fork of `bench` and return its records ordered by fork,
    /// then iteration.
    pub fn run<B: Benchmark>(&self, bench: &B) -> Vec<IterationRecord> {
        let records = Mutex::new(Vec::new());
        info!(
            benchmark = bench.name(),
            forks = self.options.forks,
            parallel = self.options.parallel_forks,
            "starting benchmark"
        );

        if self.options.parallel_forks && self.options.forks > 1 {
            thread::scope(|scope| {
                for fork in 0..self.options.forks {
                    let records = &records;
                    scope.spawn(move || {
                        let fork_records = self.run_fork(bench, fork);
                        records.lock().extend(fork_records);
                    });
                }
            });
        } else {
            for fork in 0..self.options.forks {
                let fork_records = self.run_fork(bench, fork);
                records.lock().extend(fork_records);
            }
        }

        let mut records = records.into_inner();
        records.sort_by_key(|record| (record.fork, record.iteration));
        info!(benchmark = bench.name(), records = records.len(), "finished benchmark");
        records
    }

    fn run_fork<B: Benchmark>(&self, bench: &B, fork: usize) -> Vec<IterationRecord> {
        let counter = Arc::new(ComparisonCounter::new());
        let mut state = bench.setup(&ForkContext {
            fork,
            counter: Arc::clone(&counter),
        });
        let params = bench.params();
        let batch = bench.batch_size().map(IterationBudget::Operations);
        let warmup = batch.unwrap_or(self.options.warmup);
        let measurement = batch.unwrap_or(self.options.measurement);
        debug!(benchmark = bench.name(), fork, ?measurement, "fork ready");

        for _ in 0..self.options.warmup_iterations {
            bench.prepare_iteration(&mut state);
            run_budget(bench, &mut state, warmup);
        }

        let mut records = Vec::with_capacity(self.options.measurement_iterations);
        for iteration in 0..self.options.measurement_iterations {
            bench.prepare_iteration(&mut state);

            let ctx = IterationContext {
                benchmark: bench.name(),
                fork,
                iteration,
                counter: &counter,
            };
            for profiler in &self.profilers {
                profiler.before_iteration(&ctx);
            }

            let timestamp_ms = unix_millis();
            let outcome = run_budget(bench, &mut state, measurement);

            let secondary = self
                .profilers
                .iter()
                .flat_map(|profiler| profiler.after_iteration(&ctx, &outcome))
                .collect();

            let mode = self.options.mode;
            let record = IterationRecord {
                benchmark: bench.name().to_string(),
                params: params.clone(),
                mode,
                fork,
                iteration,
                timestamp_ms,
                operations: outcome.operations,
                elapsed_ns: u64::try_from(outcome.elapsed.as_nanos()).unwrap_or(u64::MAX),
                score: mode.score(outcome.operations, outcome.elapsed),
                score_unit: mode.unit().to_string(),
                secondary,
            };
            debug!(
                benchmark = bench.name(),
                fork,
                iteration,
                operations = record.operations,
                score = record.score,
                unit = mode.unit(),
                "iteration complete"
            );
            records.push(record);
        }
        records
    }
}

/// Run the operation until the budget is spent.
fn run_budget<B: Benchmark>(
    bench: &B,
    state: &mut B::State,
    budget: IterationBudget,
) -> IterationOutcome {
    let start = Instant::now();
    let operations = match budget {
        IterationBudget::Operations(count) => {
            for _ in 0..count {
                bench.operation(black_box(&mut *state));
            }
            count
        }
        IterationBudget::Time(limit) => {
            let mut count = 0;
            loop {
                bench.operation(black_box(&mut *state));
                count += 1;
                if start.elapsed() >= limit {
                    break count;
                }
            }
        }
    };
    IterationOutcome {
        operations,
        elapsed: start.elapsed(),
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::options::Mode;
    use crate::bench::profiler::SecondaryResult;
    use std::time::Duration;

    /// Performs exactly three comparisons per operation.
    struct Counting;

    impl Benchmark for Counting {
        type State = (Arc<ComparisonCounter>, u64);

        fn name(&self) -> &str {
            "counting"
        }

        fn setup(&self, fork: &ForkContext) -> Self::State {
            fork.counter.add(1_000);
            (Arc::clone(&fork.counter), 0)
        }

        fn prepare_iteration(&self, state: &mut Self::State) {
            // setup work must not leak into the measurement
            state.0.add(7);
            state.1 = 0;
        }

        fn operation(&self, state: &mut Self::State) {
            state.0.add(3);
            state.1 += 1;
        }
    }

    fn options(forks: usize, parallel: bool) -> BenchOptions {
        BenchOptions {
            forks,
            parallel_forks: parallel,
            warmup_iterations: 2,
            warmup: IterationBudget::Operations(5),
            measurement_iterations: 4,
            measurement: IterationBudget::Operations(10),
            ..BenchOptions::default()
        }
    }

    #[test]
    fn test_records_per_fork_and_iteration() {
        let harness = Harness::new(options(2, false)).unwrap();
        let records = harness.run(&Counting);

        assert_eq!(records.len(), 8);
        let order: Vec<(usize, usize)> = records.iter().map(|r| (r.fork, r.iteration)).collect();
        assert_eq!(order[0], (0, 0));
        assert_eq!(order[4], (1, 0));
        assert_eq!(order[7], (1, 3));
        assert!(records.iter().all(|r| r.operations == 10));
    }

    #[test]
    fn test_comparisons_exclude_setup_and_warmup() {
        let harness = Harness::new(options(1, false)).unwrap();
        for record in harness.run(&Counting) {
            let total = record.secondary(ComparisonCountProfiler::LABEL).unwrap();
            let per_op = record.secondary(ComparisonCountProfiler::PER_OP_LABEL).unwrap();
            assert_eq!(total.score, 30.0);
            assert_eq!(per_op.score, 3.0);
        }
    }

    #[test]
    fn test_parallel_forks_match_sequential() {
        let sequential = Harness::new(options(3, false)).unwrap().run(&Counting);
        let parallel = Harness::new(options(3, true)).unwrap().run(&Counting);

        let key = |r: &IterationRecord| (r.fork, r.iteration, r.operations, r.secondary.clone());
        assert_eq!(
            sequential.iter().map(key).collect::<Vec<_>>(),
            parallel.iter().map(key).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_unprofiled_has_no_secondary_results() {
        let harness = Harness::new(BenchOptions {
            profile_comparisons: false,
            ..options(1, false)
        })
        .unwrap();
        assert!(harness.profilers().is_empty());
        assert!(harness.run(&Counting).iter().all(|r| r.secondary.is_empty()));
    }

    #[test]
    fn test_time_budget_runs_at_least_once() {
        let harness = Harness::new(BenchOptions {
            warmup_iterations: 0,
            measurement_iterations: 1,
            measurement: IterationBudget::Time(Duration::from_millis(5)),
            mode: Mode::Throughput,
            ..options(1, false)
        })
        .unwrap();
        let records = harness.run(&Counting);

        assert_eq!(records.len(), 1);
        assert!(records[0].operations >= 1);
        assert!(records[0].elapsed_ns >= 5_000_000);
        assert_eq!(records[0].score_unit, "ops/s");
    }

    #[test]
    fn test_fn_benchmark() {
        let harness = Harness::new(options(1, false)).unwrap();
        let bench = FnBenchmark::new(
            "closure",
            |fork: &ForkContext| Arc::clone(&fork.counter),
            |counter: &mut Arc<ComparisonCounter>| counter.increment(),
        );
        let records = harness.run(&bench);

        assert_eq!(records[0].benchmark, "closure");
        assert_eq!(records[0].secondary("Comparisons").unwrap().score, 10.0);
    }

    /// `Counting` pinned to four operations per iteration.
    struct Batched;

    impl Benchmark for Batched {
        type State = <Counting as Benchmark>::State;

        fn name(&self) -> &str {
            "batched"
        }

        fn setup(&self, fork: &ForkContext) -> Self::State {
            Counting.setup(fork)
        }

        fn operation(&self, state: &mut Self::State) {
            Counting.operation(state)
        }

        fn batch_size(&self) -> Option<u64> {
            Some(4)
        }
    }

    #[test]
    fn test_batch_size_overrides_budget() {
        let harness = Harness::new(BenchOptions {
            warmup: IterationBudget::Time(Duration::from_millis(5)),
            measurement: IterationBudget::Time(Duration::from_millis(5)),
            ..options(1, false)
        })
        .unwrap();
        let records = harness.run(&Batched);

        assert_eq!(records.len(), 4);
        for record in &records {
            assert_eq!(record.operations, 4);
            assert_eq!(record.secondary("Comparisons").unwrap().score, 12.0);
        }
    }

    /// Reports the operation count of every iteration.
    struct OperationsProfiler;

    impl Profiler for OperationsProfiler {
        fn description(&self) -> &str {
            "Counts operations"
        }

        fn before_iteration(&self, _ctx: &IterationContext<'_>) {}

        fn after_iteration(
            &self,
            ctx: &IterationContext<'_>,
            outcome: &IterationOutcome,
        ) -> Vec<SecondaryResult> {
            let label = format!("{}:{}", ctx.benchmark, ctx.iteration);
            vec![SecondaryResult::new(label, outcome.operations as f64, "ops")]
        }
    }

    #[test]
    fn test_with_profiler_adds_secondary_results() {
        let harness = Harness::new(options(1, false))
            .unwrap()
            .with_profiler(OperationsProfiler);
        assert_eq!(
            harness.profilers(),
            vec!["Counts key comparisons performed by the index", "Counts operations"]
        );

        let records = harness.run(&Counting);
        for record in &records {
            // the built-in profiler's results come first
            assert_eq!(record.secondary.len(), 3);
            assert_eq!(record.secondary[0].label, ComparisonCountProfiler::LABEL);
            let own = format!("counting:{}", record.iteration);
            assert_eq!(record.secondary(&own).unwrap().score, 10.0);
        }
    }

    #[test]
    fn test_rejects_invalid_options() {
        assert!(Harness::new(options(0, false)).is_err());
    }
}
