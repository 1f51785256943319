//! Runs the standard benchmark suite and writes the results file.
//!
//! Usage: `comparison-bench [RESULTS_FILE]`
//!
//! The format follows the extension of `RESULTS_FILE` (`.csv` for CSV,
//! JSON otherwise). Logging is controlled through `RUST_LOG`.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use btree_index::bench::suite::{run_suite, DEFAULT_ORDERS, DEFAULT_SAMPLE_SIZES};
use btree_index::bench::{BenchOptions, Harness, ResultFormat};

fn main() -> btree_index::Result<()> {
    install_tracing_subscriber();

    let mut options = BenchOptions::default();
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        options.result_format = ResultFormat::from_path(&path);
        options.results_file = path;
    }

    let harness = Harness::new(options)?;
    info!(profilers = ?harness.profilers(), "running benchmark suite");

    let report = run_suite(&harness, &DEFAULT_ORDERS, &DEFAULT_SAMPLE_SIZES)?;
    let options = harness.options();
    report.write_to_file(options.result_format, &options.results_file)?;
    Ok(())
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
