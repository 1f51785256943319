//! Benchmark results and their JSON / CSV encodings.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::options::{Mode, ResultFormat};
use super::profiler::SecondaryResult;
use crate::common::Result;

/// Measurements of one iteration of one benchmark in one fork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub benchmark: String,
    pub params: BTreeMap<String, String>,
    pub mode: Mode,
    pub fork: usize,
    pub iteration: usize,
    /// Milliseconds since the Unix epoch when the iteration started.
    pub timestamp_ms: u64,
    pub operations: u64,
    pub elapsed_ns: u64,
    pub score: f64,
    pub score_unit: String,
    pub secondary: Vec<SecondaryResult>,
}

impl IterationRecord {
    /// Secondary result with the given label, if a profiler produced one.
    pub fn secondary(&self, label: &str) -> Option<&SecondaryResult> {
        self.secondary.iter().find(|result| result.label == label)
    }

    /// Parameters rendered as `key=value` pairs joined by `;`.
    pub fn params_string(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// One line of the CSV encoding.
///
/// The primary score gets a row named after the benchmark; every secondary
/// result gets a row named `benchmark:Label`.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    benchmark: String,
    params: &'a str,
    mode: Mode,
    fork: usize,
    iteration: usize,
    timestamp_ms: u64,
    operations: u64,
    score: f64,
    unit: &'a str,
}

/// All records produced by a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchReport {
    records: Vec<IterationRecord>,
}

impl BenchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of a single benchmark, in fork then iteration order.
    pub fn benchmark<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a IterationRecord> + 'a {
        self.records.iter().filter(move |record| record.benchmark == name)
    }

    /// Write the records as a pretty-printed JSON array.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.records)?;
        Ok(())
    }

    /// Write the records as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        for record in &self.records {
            let params = record.params_string();
            csv.serialize(CsvRow {
                benchmark: record.benchmark.clone(),
                params: &params,
                mode: record.mode,
                fork: record.fork,
                iteration: record.iteration,
                timestamp_ms: record.timestamp_ms,
                operations: record.operations,
                score: record.score,
                unit: &record.score_unit,
            })?;
            for secondary in &record.secondary {
                csv.serialize(CsvRow {
                    benchmark: format!("{}:{}", record.benchmark, secondary.label),
                    params: &params,
                    mode: record.mode,
                    fork: record.fork,
                    iteration: record.iteration,
                    timestamp_ms: record.timestamp_ms,
                    operations: record.operations,
                    score: secondary.score,
                    unit: &secondary.unit,
                })?;
            }
        }
        csv.flush()?;
        Ok(())
    }

    /// Write the report to `path`, creating parent directories as needed.
    pub fn write_to_file(&self, format: ResultFormat, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            ResultFormat::Json => self.write_json(&mut writer)?,
            ResultFormat::Csv => self.write_csv(&mut writer)?,
        }
        writer.flush()?;
        info!(path = %path.display(), records = self.len(), ?format, "wrote benchmark results");
        Ok(())
    }
}

impl Extend<IterationRecord> for BenchReport {
    fn extend<I: IntoIterator<Item = IterationRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl FromIterator<IterationRecord> for BenchReport {
    fn from_iter<I: IntoIterator<Item = IterationRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
