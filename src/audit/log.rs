//! Persisted record of what the pipeline last produced.
//!
//! Cumulative stage counters sit next to the most recent output of each
//! stage and a digest of the last benchmark batch, so `status` can answer
//! "what is on disk and how good was it" without rerunning anything.

use crate::aggregator::AggregateSummary;
use crate::benchmark::RunReport;
use crate::labeler::LabelStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Totals across every invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageCounters {
    pub files_labeled: u64,
    pub rows_labeled: u64,
    pub merges: u64,
    pub rows_aggregated: u64,
    pub benchmark_runs: u64,
    pub reports_reshaped: u64,
}

/// A file written by a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutput {
    pub path: PathBuf,
    pub rows: usize,
    pub written_at: DateTime<Utc>,
}

impl StageOutput {
    fn now(path: &Path, rows: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            rows,
            written_at: Utc::now(),
        }
    }
}

/// Digest of one benchmark batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub model: String,
    pub runs: usize,
    pub input: PathBuf,
    /// Mean over runs of the cross-validation accuracy
    pub mean_cv_accuracy: f64,
    /// Mean over runs of the held-out macro F1
    pub mean_f1_macro: f64,
    pub best_cv_accuracy: f64,
    pub finished_at: DateTime<Utc>,
}

impl BenchmarkSummary {
    /// `None` for an empty batch.
    pub fn from_reports(input: &Path, reports: &[RunReport]) -> Option<Self> {
        let first = reports.first()?;
        let n = reports.len() as f64;
        Some(Self {
            model: first.model.clone(),
            runs: reports.len(),
            input: input.to_path_buf(),
            mean_cv_accuracy: reports.iter().map(|r| r.cv_accuracy).sum::<f64>() / n,
            mean_f1_macro: reports.iter().map(|r| r.validation.f1_macro).sum::<f64>() / n,
            best_cv_accuracy: reports
                .iter()
                .map(|r| r.cv_accuracy)
                .fold(f64::NEG_INFINITY, f64::max),
            finished_at: Utc::now(),
        })
    }
}

/// The run log file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunLog {
    pub counters: StageCounters,
    pub merged: Option<StageOutput>,
    pub feature_table: Option<StageOutput>,
    /// Rows per category in the last feature table
    pub feature_rows: Vec<(String, usize)>,
    pub reshaped: Option<StageOutput>,
    pub last_benchmark: Option<BenchmarkSummary>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl RunLog {
    /// Open the log stored at `path`. A missing or unreadable file starts an
    /// empty log that will be written back to `path`.
    pub fn open(path: PathBuf) -> Self {
        let mut log = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<RunLog>(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Run log unreadable, starting fresh");
                RunLog::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RunLog::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read run log");
                RunLog::default()
            }
        };
        log.path = Some(path);
        log
    }

    pub fn record_labeled(&mut self, stats: &[LabelStats]) {
        self.counters.files_labeled += stats.len() as u64;
        self.counters.rows_labeled += stats.iter().map(|s| s.rows as u64).sum::<u64>();
    }

    pub fn record_merged(&mut self, output: &Path, rows: usize) {
        self.counters.merges += 1;
        self.merged = Some(StageOutput::now(output, rows));
    }

    pub fn record_aggregated(&mut self, output: &Path, summary: &AggregateSummary) {
        self.counters.rows_aggregated += summary.rows as u64;
        self.feature_table = Some(StageOutput::now(output, summary.rows));
        self.feature_rows = summary
            .per_category
            .iter()
            .map(|(category, rows)| (category.clone(), *rows))
            .collect();
    }

    pub fn record_benchmark(&mut self, input: &Path, reports: &[RunReport]) {
        self.counters.benchmark_runs += reports.len() as u64;
        if let Some(summary) = BenchmarkSummary::from_reports(input, reports) {
            self.last_benchmark = Some(summary);
        }
    }

    pub fn record_reshaped(&mut self, output: &Path, rows: usize) {
        self.counters.reports_reshaped += 1;
        self.reshaped = Some(StageOutput::now(output, rows));
    }

    /// Write the log back to the path it was opened from.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Run log saved");
        Ok(())
    }

    pub fn summary(&self) -> String {
        let c = &self.counters;
        let mut out = String::new();
        let _ = writeln!(out, "Run Statistics:");
        let _ = writeln!(out, "  Capture files labeled:   {}", c.files_labeled);
        let _ = writeln!(out, "  Rows labeled:            {}", c.rows_labeled);
        let _ = writeln!(out, "  Merges:                  {}", c.merges);
        let _ = writeln!(out, "  Feature rows aggregated: {}", c.rows_aggregated);
        let _ = writeln!(out, "  Benchmark runs:          {}", c.benchmark_runs);
        let _ = writeln!(out, "  Reports reshaped:        {}", c.reports_reshaped);

        let _ = writeln!(out, "\nLatest outputs:");
        for (label, output) in [
            ("Merged file", &self.merged),
            ("Feature table", &self.feature_table),
            ("Reshaped report", &self.reshaped),
        ] {
            match output {
                Some(o) => {
                    let _ = writeln!(
                        out,
                        "  {label:<16} {} ({} rows, {})",
                        o.path.display(),
                        o.rows,
                        o.written_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                None => {
                    let _ = writeln!(out, "  {label:<16} none");
                }
            }
        }
        for (category, rows) in &self.feature_rows {
            let _ = writeln!(out, "    {category:<14} {rows:>8} rows");
        }

        match &self.last_benchmark {
            Some(b) => {
                let _ = write!(
                    out,
                    "\nLast benchmark: {} x{} on {}\n  mean accuracy: {:.4}, best: {:.4}, mean f1: {:.4}",
                    b.model,
                    b.runs,
                    b.input.display(),
                    b.mean_cv_accuracy,
                    b.best_cv_accuracy,
                    b.mean_f1_macro
                );
            }
            None => out.push_str("\nNo benchmark recorded."),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{ConfusionMatrix, Scores};
    use crate::dataset::Category;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use uuid::Uuid;

    fn report(cv_accuracy: f64, f1_macro: f64) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            run_index: 0,
            started_at: Utc::now(),
            model: "R.Forest".to_string(),
            cv_accuracy,
            fold_accuracies: vec![cv_accuracy],
            validation: Scores {
                accuracy: cv_accuracy,
                f1_macro,
                precision_macro: f1_macro,
                recall_macro: f1_macro,
            },
            confusion: ConfusionMatrix::new(&[0], &[0]),
            elapsed: Duration::from_millis(5),
        }
    }

    fn label_stats(rows: usize) -> LabelStats {
        LabelStats {
            category: Category::Laptop,
            output: PathBuf::from("flow-laptop.csv"),
            rows,
        }
    }

    #[test]
    fn test_counters_accumulate() {
        let mut log = RunLog::default();
        log.record_labeled(&[label_stats(40), label_stats(5)]);
        log.record_labeled(&[label_stats(1)]);
        log.record_benchmark(Path::new("t.csv"), &[report(0.9, 0.8), report(0.7, 0.6)]);

        assert_eq!(log.counters.files_labeled, 3);
        assert_eq!(log.counters.rows_labeled, 46);
        assert_eq!(log.counters.benchmark_runs, 2);
        assert_eq!(log.counters.reports_reshaped, 0);
    }

    #[test]
    fn test_benchmark_digest() {
        let mut log = RunLog::default();
        log.record_benchmark(Path::new("flowLabel.csv"), &[report(0.9, 0.8), report(0.7, 0.6)]);

        let b = log.last_benchmark.as_ref().unwrap();
        assert_eq!(b.model, "R.Forest");
        assert_eq!(b.runs, 2);
        assert!((b.mean_cv_accuracy - 0.8).abs() < 1e-12);
        assert!((b.mean_f1_macro - 0.7).abs() < 1e-12);
        assert!((b.best_cv_accuracy - 0.9).abs() < 1e-12);

        // An empty batch keeps the previous digest
        log.record_benchmark(Path::new("other.csv"), &[]);
        assert_eq!(log.last_benchmark.as_ref().unwrap().input, PathBuf::from("flowLabel.csv"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run_log.json");

        let mut log = RunLog::open(path.clone());
        log.record_labeled(&[label_stats(900)]);
        log.record_merged(Path::new("logFlow.csv"), 900);
        let mut per_category = BTreeMap::new();
        per_category.insert("laptop".to_string(), 900);
        log.record_aggregated(
            Path::new("flowLabel.csv"),
            &AggregateSummary {
                rows: 900,
                per_category,
            },
        );
        log.save().unwrap();

        let resumed = RunLog::open(path);
        assert_eq!(resumed.counters.rows_labeled, 900);
        assert_eq!(resumed.counters.merges, 1);
        assert_eq!(resumed.feature_table.as_ref().unwrap().rows, 900);
        assert_eq!(resumed.feature_rows, vec![("laptop".to_string(), 900)]);
        assert!(resumed.last_benchmark.is_none());
    }

    #[test]
    fn test_corrupt_log_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_log.json");
        std::fs::write(&path, "not json").unwrap();

        let log = RunLog::open(path.clone());
        assert_eq!(log.counters, StageCounters::default());
        log.save().unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("counters"));
    }

    #[test]
    fn test_summary_lists_outputs_and_benchmark() {
        let mut log = RunLog::default();
        assert!(log.summary().contains("No benchmark recorded"));

        log.record_reshaped(Path::new("report.csv"), 12);
        log.record_benchmark(Path::new("flowLabel.csv"), &[report(0.95, 0.9)]);
        let summary = log.summary();
        assert!(summary.contains("report.csv (12 rows"));
        assert!(summary.contains("Last benchmark: R.Forest x1"));
        assert!(summary.contains("mean accuracy: 0.9500"));
    }
}
