//! Harness options.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};

/// Directory results files are written to by default.
pub const DEFAULT_RESULTS_DIR: &str = "target/benchmarks";

/// How the primary score of an iteration is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Average wall-clock time per operation, in nanoseconds.
    AverageTime,
    /// Operations completed per second.
    Throughput,
}

impl Mode {
    /// Unit of the primary score.
    pub fn unit(&self) -> &'static str {
        match self {
            Mode::AverageTime => "ns/op",
            Mode::Throughput => "ops/s",
        }
    }

    /// Primary score for `operations` completed in `elapsed`.
    pub fn score(&self, operations: u64, elapsed: Duration) -> f64 {
        if operations == 0 {
            return 0.0;
        }
        match self {
            Mode::AverageTime => elapsed.as_nanos() as f64 / operations as f64,
            Mode::Throughput => {
                let secs = elapsed.as_secs_f64();
                if secs == 0.0 {
                    0.0
                } else {
                    operations as f64 / secs
                }
            }
        }
    }
}

/// Encoding of the results file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFormat {
    Json,
    Csv,
}

impl ResultFormat {
    /// Pick the format from a file extension: `.csv` is CSV, anything else
    /// is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ResultFormat::Csv,
            _ => ResultFormat::Json,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ResultFormat::Json => "json",
            ResultFormat::Csv => "csv",
        }
    }
}

/// How long a single warmup or measured iteration runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationBudget {
    /// Repeat the operation until this much wall-clock time has passed.
    Time(Duration),
    /// Run the operation exactly this many times.
    Operations(u64),
}

impl IterationBudget {
    fn is_zero(&self) -> bool {
        match self {
            IterationBudget::Time(duration) => duration.is_zero(),
            IterationBudget::Operations(count) => *count == 0,
        }
    }
}

/// Options controlling a benchmark run.
///
/// # Example
/// ```
/// use btree_index::bench::{BenchOptions, IterationBudget, ResultFormat};
///
/// let options = BenchOptions {
///     forks: 1,
///     measurement: IterationBudget::Operations(1_000),
///     ..BenchOptions::csv()
/// };
/// assert_eq!(options.result_format, ResultFormat::Csv);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BenchOptions {
    /// Number of isolated runs, each with fresh state and a fresh counter.
    pub forks: usize,

    /// Run forks on separate threads instead of one after another.
    pub parallel_forks: bool,

    /// Unrecorded iterations run before measuring.
    pub warmup_iterations: usize,

    /// Budget of each warmup iteration.
    pub warmup: IterationBudget,

    /// Recorded iterations per fork.
    pub measurement_iterations: usize,

    /// Budget of each measured iteration.
    pub measurement: IterationBudget,

    pub mode: Mode,

    pub result_format: ResultFormat,

    pub results_file: PathBuf,

    /// Attach the comparison-count profiler.
    pub profile_comparisons: bool,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            forks: 2,
            parallel_forks: false,
            warmup_iterations: 1,
            warmup: IterationBudget::Time(Duration::from_millis(500)),
            measurement_iterations: 5,
            measurement: IterationBudget::Time(Duration::from_secs(1)),
            mode: Mode::AverageTime,
            result_format: ResultFormat::Json,
            results_file: Path::new(DEFAULT_RESULTS_DIR).join("output.json"),
            profile_comparisons: true,
        }
    }
}

impl BenchOptions {
    /// Default options writing JSON.
    pub fn json() -> Self {
        Self::default()
    }

    /// Default options writing CSV.
    pub fn csv() -> Self {
        Self {
            result_format: ResultFormat::Csv,
            results_file: Path::new(DEFAULT_RESULTS_DIR).join("output.csv"),
            ..Self::default()
        }
    }

    /// One fork with short, operation-counted iterations.
    pub fn quick() -> Self {
        Self {
            forks: 1,
            warmup_iterations: 1,
            warmup: IterationBudget::Operations(1_000),
            measurement_iterations: 3,
            measurement: IterationBudget::Operations(10_000),
            ..Self::default()
        }
    }

    /// Default options without the comparison-count profiler.
    pub fn unprofiled() -> Self {
        Self {
            profile_comparisons: false,
            ..Self::default()
        }
    }

    /// Reject options that could not produce any measurement.
    ///
    /// # Errors
    /// `Error::InvalidConfiguration` for zero forks, zero measured
    /// iterations or an empty budget.
    pub fn validate(&self) -> Result<()> {
        if self.forks == 0 {
            return Err(Error::InvalidConfiguration(
                "forks must be at least 1".into(),
            ));
        }
        if self.measurement_iterations == 0 {
            return Err(Error::InvalidConfiguration(
                "measurement_iterations must be at least 1".into(),
            ));
        }
        if self.measurement.is_zero() {
            return Err(Error::InvalidConfiguration(
                "measurement budget must be non-zero".into(),
            ));
        }
        if self.warmup_iterations > 0 && self.warmup.is_zero() {
            return Err(Error::InvalidConfiguration(
                "warmup budget must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        for options in [
            BenchOptions::json(),
            BenchOptions::csv(),
            BenchOptions::quick(),
            BenchOptions::unprofiled(),
        ] {
            options.validate().unwrap();
        }
    }

    #[test]
    fn test_rejects_empty_runs() {
        let no_forks = BenchOptions {
            forks: 0,
            ..BenchOptions::default()
        };
        assert!(matches!(
            no_forks.validate(),
            Err(Error::InvalidConfiguration(_))
        ));

        let no_iterations = BenchOptions {
            measurement_iterations: 0,
            ..BenchOptions::default()
        };
        assert!(no_iterations.validate().is_err());

        let empty_budget = BenchOptions {
            measurement: IterationBudget::Operations(0),
            ..BenchOptions::default()
        };
        assert!(empty_budget.validate().is_err());
    }

    #[test]
    fn test_zero_warmup_budget_allowed_without_warmup() {
        let options = BenchOptions {
            warmup_iterations: 0,
            warmup: IterationBudget::Time(Duration::ZERO),
            ..BenchOptions::default()
        };
        options.validate().unwrap();
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ResultFormat::from_path(Path::new("out/results.CSV")),
            ResultFormat::Csv
        );
        assert_eq!(
            ResultFormat::from_path(Path::new("out/results.json")),
            ResultFormat::Json
        );
        assert_eq!(
            ResultFormat::from_path(Path::new("results")),
            ResultFormat::Json
        );
    }

    #[test]
    fn test_mode_score() {
        let elapsed = Duration::from_micros(10);
        assert_eq!(Mode::AverageTime.score(10, elapsed), 1_000.0);
        assert!((Mode::Throughput.score(10, elapsed) - 1_000_000.0).abs() < 1e-3);
        assert_eq!(Mode::AverageTime.score(0, elapsed), 0.0);
    }
}
