//! Benchmark runs: split, cross-validate, score the held-out partition.
//!
//! Repetitions are independent and run on a fixed-size pool of worker
//! threads fed through a job channel. Results are gathered after every
//! worker has finished and returned in run order.

use crate::benchmark::classifier::{Classifier, ModelKind};
use crate::benchmark::forest::RandomForest;
use crate::benchmark::metrics::{classification_report, ConfusionMatrix, Scores};
use crate::benchmark::split::{k_fold, train_validation_split};
use crate::benchmark::table::FeatureTable;
use crate::benchmark::tree::{DecisionTree, TreeParams};
use crate::config::BenchmarkConfig;
use crate::dataset::Category;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::unbounded;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Digits printed in the classification report.
const REPORT_DIGITS: usize = 4;

/// Outcome of one benchmark repetition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Position among the repetitions, starting at 0
    pub run_index: usize,
    pub started_at: DateTime<Utc>,
    pub model: String,
    /// Mean accuracy over the cross-validation folds
    pub cv_accuracy: f64,
    pub fold_accuracies: Vec<f64>,
    /// Scores on the held-out validation partition
    pub validation: Scores,
    pub confusion: ConfusionMatrix,
    pub elapsed: Duration,
}

impl RunReport {
    /// Human readable report: headline scores, the normalized
    /// confusion-matrix diagonal and the classification report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Run {} ({})\n{}: accuracy: {:.6}, f1: {:.6}, recall: {:.6}, precision: {:.6}, time: {:.6}",
            self.run_index + 1,
            self.run_id,
            self.model,
            self.cv_accuracy,
            self.validation.f1_macro,
            self.validation.recall_macro,
            self.validation.precision_macro,
            self.elapsed.as_secs_f64()
        );

        let diagonal: Vec<String> = self
            .confusion
            .normalized_diagonal()
            .iter()
            .map(|v| if v.is_nan() { "nan".to_string() } else { format!("{v:.4}") })
            .collect();
        let _ = writeln!(out, "[{}]", diagonal.join(" "));
        out.push_str(&classification_report(&self.confusion, REPORT_DIGITS));
        out
    }
}

/// Run one repetition with classifiers produced by `make` from a seed.
pub fn run_once<C, F>(
    table: &FeatureTable,
    config: &BenchmarkConfig,
    make: &F,
    seed: u64,
) -> Result<RunReport>
where
    C: Classifier,
    F: Fn(u64) -> C,
{
    let started_at = Utc::now();
    let timer = Instant::now();
    let n_classes = Category::ALL.len();

    let labels = table.class_indices();
    let split = train_validation_split(
        &labels,
        config.validation_size,
        config.split_seed,
        config.split,
    )?;
    let train = table.subset(&split.train);
    let validation = table.subset(&split.validation);
    let train_labels = train.class_indices();

    let mut fold_accuracies = Vec::with_capacity(config.folds);
    for (i, fold) in k_fold(train.len(), config.folds)?.into_iter().enumerate() {
        let fold_train = train.subset(&fold.train);
        let fold_test = train.subset(&fold.test);

        let mut model = make(seed.wrapping_add(i as u64 + 1));
        model.fit(&fold_train.features, &fold_train.class_indices(), n_classes)?;
        let predicted = model.predict(&fold_test.features);
        let accuracy = ConfusionMatrix::new(&fold_test.class_indices(), &predicted).accuracy();
        debug!(fold = i, accuracy, "Cross-validation fold scored");
        fold_accuracies.push(accuracy);
    }
    let cv_accuracy = fold_accuracies.iter().sum::<f64>() / fold_accuracies.len() as f64;

    let mut model = make(seed);
    model.fit(&train.features, &train_labels, n_classes)?;
    let predicted = model.predict(&validation.features);
    let confusion = ConfusionMatrix::new(&validation.class_indices(), &predicted);

    Ok(RunReport {
        run_id: Uuid::new_v4(),
        run_index: 0,
        started_at,
        model: model.name().to_string(),
        cv_accuracy,
        fold_accuracies,
        validation: Scores::from_matrix(&confusion),
        confusion,
        elapsed: timer.elapsed(),
    })
}

/// Run `config.runs` repetitions on `config.workers` threads.
///
/// Each repetition gets its own classifier seed, derived from `base_seed`.
pub fn run_repeated<C, F>(
    table: &FeatureTable,
    config: &BenchmarkConfig,
    base_seed: u64,
    make: F,
) -> Result<Vec<RunReport>>
where
    C: Classifier,
    F: Fn(u64) -> C + Sync,
{
    if config.runs == 0 || config.workers == 0 {
        return Err(PipelineError::InvalidParameter(
            "runs and workers must be at least 1".to_string(),
        ));
    }
    if table.is_empty() {
        return Err(PipelineError::InvalidParameter(
            "feature table is empty".to_string(),
        ));
    }

    let mut seeder = StdRng::seed_from_u64(base_seed);
    let (job_tx, job_rx) = unbounded::<(usize, u64)>();
    for index in 0..config.runs {
        let _ = job_tx.send((index, seeder.gen()));
    }
    drop(job_tx);

    let (result_tx, result_rx) = unbounded::<(usize, Result<RunReport>)>();
    let workers = config.workers.min(config.runs);
    info!(runs = config.runs, workers, rows = table.len(), "Starting benchmark");

    std::thread::scope(|scope| {
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let make = &make;
            scope.spawn(move || {
                for (index, seed) in job_rx.iter() {
                    debug!(worker, run = index, "Benchmark run started");
                    let report = run_once(table, config, make, seed).map(|mut report| {
                        report.run_index = index;
                        report
                    });
                    if result_tx.send((index, report)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(result_tx);

    let mut results: Vec<(usize, Result<RunReport>)> = result_rx.iter().collect();
    results.sort_by_key(|(index, _)| *index);

    let reports: Vec<RunReport> = results
        .into_iter()
        .map(|(_, report)| report)
        .collect::<Result<_>>()?;

    for report in &reports {
        info!(
            run = report.run_index + 1,
            cv_accuracy = report.cv_accuracy,
            f1 = report.validation.f1_macro,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Benchmark run finished"
        );
    }
    Ok(reports)
}

/// Load the feature table and benchmark the configured model.
pub fn run_benchmark(config: &BenchmarkConfig) -> Result<Vec<RunReport>> {
    let table = FeatureTable::load(&config.input)?;
    let base_seed = config.forest.seed.unwrap_or_else(rand::random);
    info!(model = %config.model, "Benchmarking classifier");

    match config.model {
        ModelKind::RandomForest => {
            let forest = config.forest.clone();
            run_repeated(&table, config, base_seed, |seed| {
                RandomForest::new(forest.clone(), seed)
            })
        }
        ModelKind::Cart => {
            let params = TreeParams {
                max_depth: config.forest.max_depth,
                min_samples_split: config.forest.min_samples_split,
                max_features: None,
            };
            run_repeated(&table, config, base_seed, |seed| {
                DecisionTree::new(params, seed)
            })
        }
    }
}
