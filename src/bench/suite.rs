//! The standard search / insert / delete / range benchmarks.
//!
//! Each benchmark is parameterized by tree order and sample size; the suite
//! runs every combination.

use std::collections::BTreeMap;
use std::hint::black_box;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::harness::{Benchmark, ForkContext, Harness};
use super::report::BenchReport;
use super::workload::{random_key, seeded_rng, shuffled_sample, DEFAULT_SEED};
use crate::common::{BTreeConfig, Error, Result};
use crate::index::BTree;
use crate::metrics::ComparisonCounter;

/// Orders exercised by the `comparison-bench` binary.
pub const DEFAULT_ORDERS: [usize; 3] = [4, 32, 256];

/// Sample sizes exercised by the `comparison-bench` binary.
pub const DEFAULT_SAMPLE_SIZES: [usize; 2] = [1_000, 10_000];

/// Number of keys covered by each range scan.
pub const RANGE_SPAN: i64 = 100;

/// Parameters shared by every standard benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    config: BTreeConfig,
    sample_size: usize,
    seed: u64,
}

impl Plan {
    /// # Errors
    /// `Error::InvalidConfiguration` for an order below 3 or an empty sample.
    pub fn new(order: usize, sample_size: usize) -> Result<Self> {
        if sample_size == 0 {
            return Err(Error::InvalidConfiguration(
                "sample size must be at least 1".into(),
            ));
        }
        Ok(Self {
            config: BTreeConfig::new(order)?,
            sample_size,
            seed: DEFAULT_SEED,
        })
    }

    /// Same plan drawing its keys from a different seed.
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn config(&self) -> BTreeConfig {
        self.config
    }

    /// Number of distinct keys, and the operations per iteration of the
    /// insert and delete benchmarks.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("order".to_string(), self.config.order().to_string()),
            ("sample_size".to_string(), self.sample_size.to_string()),
        ])
    }

    fn rng(&self, fork: usize) -> ChaCha8Rng {
        seeded_rng(self.seed.wrapping_add(fork as u64))
    }

    fn filled_tree(&self, keys: &[i64], counter: &Arc<ComparisonCounter>) -> BTree<i64, i64> {
        let mut tree = BTree::with_counter(self.config, Arc::clone(counter));
        tree.extend(keys.iter().map(|&key| (key, key)));
        tree
    }
}

/// State shared by the standard benchmarks.
pub struct TreeState {
    pub tree: BTree<i64, i64>,
    pub keys: Vec<i64>,
    pub cursor: usize,
    counter: Arc<ComparisonCounter>,
    rng: ChaCha8Rng,
}

impl TreeState {
    fn next_key(&mut self) -> i64 {
        let key = self.keys[self.cursor % self.keys.len()];
        self.cursor += 1;
        key
    }

    fn random_key(&mut self) -> i64 {
        random_key(&self.keys, &mut self.rng).copied().unwrap_or_default()
    }
}

fn setup_state(plan: &Plan, fork: &ForkContext, filled: bool) -> TreeState {
    let mut rng = plan.rng(fork.fork);
    let keys = shuffled_sample(plan.sample_size, &mut rng);
    let tree = if filled {
        plan.filled_tree(&keys, &fork.counter)
    } else {
        BTree::with_counter(plan.config, Arc::clone(&fork.counter))
    };
    TreeState {
        tree,
        keys,
        cursor: 0,
        counter: Arc::clone(&fork.counter),
        rng,
    }
}

/// Point lookups of random present keys in a filled tree.
pub struct SearchBenchmark(pub Plan);

impl Benchmark for SearchBenchmark {
    type State = TreeState;

    fn name(&self) -> &str {
        "search"
    }

    fn params(&self) -> BTreeMap<String, String> {
        self.0.params()
    }

    fn setup(&self, fork: &ForkContext) -> TreeState {
        setup_state(&self.0, fork, true)
    }

    fn operation(&self, state: &mut TreeState) {
        let key = state.random_key();
        black_box(state.tree.search(&key));
    }
}

/// Inserts of shuffled keys into a tree emptied before every iteration.
///
/// Each iteration inserts every sampled key exactly once.
pub struct InsertBenchmark(pub Plan);

impl Benchmark for InsertBenchmark {
    type State = TreeState;

    fn name(&self) -> &str {
        "insert"
    }

    fn params(&self) -> BTreeMap<String, String> {
        self.0.params()
    }

    fn setup(&self, fork: &ForkContext) -> TreeState {
        setup_state(&self.0, fork, false)
    }

    fn batch_size(&self) -> Option<u64> {
        Some(self.0.sample_size as u64)
    }

    fn prepare_iteration(&self, state: &mut TreeState) {
        state.tree.clear();
        state.keys.shuffle(&mut state.rng);
        state.cursor = 0;
    }

    fn operation(&self, state: &mut TreeState) {
        let key = state.next_key();
        black_box(state.tree.insert(key, key));
    }
}

/// Deletes of shuffled keys from a tree refilled before every iteration.
///
/// Each iteration deletes every sampled key exactly once, leaving the tree
/// empty.
pub struct DeleteBenchmark(pub Plan);

impl Benchmark for DeleteBenchmark {
    type State = TreeState;

    fn name(&self) -> &str {
        "delete"
    }

    fn params(&self) -> BTreeMap<String, String> {
        self.0.params()
    }

    fn setup(&self, fork: &ForkContext) -> TreeState {
        setup_state(&self.0, fork, false)
    }

    fn batch_size(&self) -> Option<u64> {
        Some(self.0.sample_size as u64)
    }

    fn prepare_iteration(&self, state: &mut TreeState) {
        state.keys.shuffle(&mut state.rng);
        state.tree = self.0.filled_tree(&state.keys, &state.counter);
        state.keys.shuffle(&mut state.rng);
        state.cursor = 0;
    }

    fn operation(&self, state: &mut TreeState) {
        let key = state.next_key();
        black_box(state.tree.delete(&key));
    }
}

/// Inclusive scans of [`RANGE_SPAN`] keys starting at a random key.
pub struct RangeBenchmark(pub Plan);

impl Benchmark for RangeBenchmark {
    type State = TreeState;

    fn name(&self) -> &str {
        "range"
    }

    fn params(&self) -> BTreeMap<String, String> {
        self.0.params()
    }

    fn setup(&self, fork: &ForkContext) -> TreeState {
        setup_state(&self.0, fork, true)
    }

    fn operation(&self, state: &mut TreeState) {
        let low = state.random_key();
        let high = low + RANGE_SPAN - 1;
        black_box(state.tree.range(low..=high).count());
    }
}

/// Run all four benchmarks for every (order, sample size) combination.
///
/// # Errors
/// `Error::InvalidConfiguration` if any order or sample size is invalid;
/// nothing is run in that case.
pub fn run_suite(harness: &Harness, orders: &[usize], sample_sizes: &[usize]) -> Result<BenchReport> {
    let mut plans = Vec::with_capacity(orders.len() * sample_sizes.len());
    for &order in orders {
        for &sample_size in sample_sizes {
            plans.push(Plan::new(order, sample_size)?);
        }
    }

    let mut report = BenchReport::new();
    for plan in plans {
        report.extend(harness.run(&SearchBenchmark(plan)));
        report.extend(harness.run(&InsertBenchmark(plan)));
        report.extend(harness.run(&DeleteBenchmark(plan)));
        report.extend(harness.run(&RangeBenchmark(plan)));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::bench::options::{BenchOptions, IterationBudget};

    fn harness(operations: u64) -> Harness {
        Harness::new(BenchOptions {
            forks: 1,
            warmup_iterations: 1,
            warmup: IterationBudget::Operations(operations),
            measurement_iterations: 2,
            measurement: IterationBudget::Operations(operations),
            ..BenchOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn test_plan_validation() {
        assert!(Plan::new(2, 10).is_err());
        assert!(Plan::new(4, 0).is_err());
        let plan = Plan::new(4, 10).unwrap();
        assert_eq!(plan.config().order(), 4);
        assert_eq!(plan.sample_size(), 10);
        assert_eq!(plan.seed(), DEFAULT_SEED);
        assert_eq!(plan.with_seed(9).seed(), 9);
    }

    #[test]
    fn test_insert_rebuilds_tree_each_iteration() {
        let plan = Plan::new(4, 200).unwrap();
        let records = harness(200).run(&InsertBenchmark(plan));

        // every iteration starts empty, so both see the same number of
        // fresh inserts and comparable comparison counts
        assert_eq!(records.len(), 2);
        for record in &records {
            assert!(record.secondary("Comparisons").unwrap().score > 0.0);
        }
    }

    #[test]
    fn test_delete_leaves_valid_tree() {
        let plan = Plan::new(5, 300).unwrap();
        let bench = DeleteBenchmark(plan);
        let counter = Arc::new(ComparisonCounter::new());
        let mut state = bench.setup(&ForkContext {
            fork: 0,
            counter: Arc::clone(&counter),
        });

        bench.prepare_iteration(&mut state);
        assert_eq!(state.tree.len(), 300);
        for _ in 0..150 {
            bench.operation(&mut state);
        }
        assert_eq!(state.tree.len(), 150);
        state.tree.validate().unwrap();
    }

    #[test]
    fn test_delete_iteration_is_one_pass_under_time_budget() {
        let plan = Plan::new(4, 100).unwrap();
        let timed = Harness::new(BenchOptions {
            forks: 1,
            warmup_iterations: 1,
            warmup: IterationBudget::Time(Duration::from_millis(20)),
            measurement_iterations: 2,
            measurement: IterationBudget::Time(Duration::from_millis(20)),
            ..BenchOptions::default()
        })
        .unwrap()
        .run(&DeleteBenchmark(plan));
        let single_pass = harness(100).run(&DeleteBenchmark(plan));

        for (timed, single) in timed.iter().zip(&single_pass) {
            assert_eq!(timed.operations, 100);
            let per_op = timed.secondary("Comparisons/op").unwrap().score;
            // a drained tree would make extra deletes nearly free
            assert!(per_op > 1.0);
            assert_eq!(per_op, single.secondary("Comparisons/op").unwrap().score);
        }
    }

    #[test]
    fn test_insert_iteration_never_replaces() {
        let plan = Plan::new(5, 64).unwrap();
        let bench = InsertBenchmark(plan);
        let counter = Arc::new(ComparisonCounter::new());
        let mut state = bench.setup(&ForkContext { fork: 0, counter });

        bench.prepare_iteration(&mut state);
        for _ in 0..bench.batch_size().unwrap() {
            bench.operation(&mut state);
        }
        assert_eq!(state.tree.len(), 64);
        assert_eq!(state.cursor, 64);
    }

    #[test]
    fn test_search_comparisons_scale_with_height() {
        let plan = Plan::new(4, 1_000).unwrap();
        let records = harness(100).run(&SearchBenchmark(plan));
        let per_op = records[0].secondary("Comparisons/op").unwrap().score;

        // at least one comparison per level, at most a full binary search per node
        assert!(per_op >= 2.0);
        assert!(per_op <= 3.0 * 10.0);
    }

    #[test]
    fn test_run_suite_covers_every_plan() {
        let report = run_suite(&harness(20), &[3, 8], &[50]).unwrap();

        // 2 plans × 4 benchmarks × 2 iterations
        assert_eq!(report.len(), 16);
        for name in ["search", "insert", "delete", "range"] {
            assert_eq!(report.benchmark(name).count(), 4);
        }
        assert!(report
            .records()
            .iter()
            .any(|r| r.params.get("order").map(String::as_str) == Some("8")));
    }

    #[test]
    fn test_run_suite_rejects_bad_order_before_running() {
        let err = run_suite(&harness(10), &[4, 1], &[10]).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }
}
