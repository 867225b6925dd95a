//! End-to-end tests for the label, merge, aggregate and benchmark stages.

use iot_flow_bench::benchmark::{run_benchmark, ForestConfig};
use iot_flow_bench::config::{
    AggregateConfig, BenchmarkConfig, LabelSource, ReshapeConfig,
};
use iot_flow_bench::reshape::{reshape_file, ReshapeSchema};
use iot_flow_bench::{aggregate_file, label_sources, merge_files, Category, PipelineError};
use std::path::{Path, PathBuf};

const CATEGORIES: [Category; 3] = [Category::AmazonEcho, Category::Laptop, Category::Netatmo];

/// Write one raw capture per category with well separated packet counts.
fn write_captures(raw_dir: &Path, rows: usize) {
    std::fs::create_dir_all(raw_dir).unwrap();
    for (c, category) in CATEGORIES.iter().enumerate() {
        let mut text = String::new();
        for i in 0..rows {
            let packets = 100 * (c + 1) + i % 7;
            text.push_str(&format!("{},{}\n", packets * 64, packets));
        }
        std::fs::write(raw_dir.join(format!("flow-{category}.csv")), text).unwrap();
    }
}

fn sources(raw_dir: &Path, out_dir: &Path) -> Vec<LabelSource> {
    CATEGORIES
        .iter()
        .map(|&c| LabelSource::conventional(c, raw_dir, out_dir))
        .collect()
}

fn label_and_merge(root: &Path, rows: usize) -> PathBuf {
    let raw_dir = root.join("Flow");
    write_captures(&raw_dir, rows);

    let sources = sources(&raw_dir, root);
    let stats = label_sources(&sources).unwrap();
    assert_eq!(stats.len(), 3);
    assert!(stats.iter().all(|s| s.rows == rows));

    let merged = root.join("FlowComLabel").join("logFlow.csv");
    let outputs: Vec<PathBuf> = sources.iter().map(|s| s.output.clone()).collect();
    assert_eq!(merge_files(&outputs, &merged).unwrap(), rows * 3);
    merged
}

#[test]
fn test_label_merge_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let merged = label_and_merge(dir.path(), 5);

    let first = std::fs::read_to_string(&merged).unwrap();
    assert!(first.starts_with("6400,100,amazonEcho\n"));

    let config = AggregateConfig {
        input: merged,
        output: dir.path().join("FlowComLabel").join("flowLabel.csv"),
        window_size: 2,
    };
    let summary = aggregate_file(&config).unwrap();
    assert_eq!(summary.rows, 15);
    assert_eq!(summary.per_category.get("laptop"), Some(&5));

    let table = std::fs::read_to_string(&config.output).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "bytes_out,packets,type,average,min,max,vari");
    assert_eq!(lines.len(), 16);
    // amazonEcho packets 100..=104: windows [100,101], [102,103], [104]
    assert_eq!(lines[1], "6400,100,amazonEcho,100,100,101,0");
    assert_eq!(lines[5], "6656,104,amazonEcho,52,52,52,0");
}

#[test]
fn test_full_pipeline_benchmark() {
    let dir = tempfile::tempdir().unwrap();
    let merged = label_and_merge(dir.path(), 30);

    let aggregate = AggregateConfig {
        input: merged,
        output: dir.path().join("flowLabel.csv"),
        window_size: 2,
    };
    aggregate_file(&aggregate).unwrap();

    let config = BenchmarkConfig {
        input: aggregate.output.clone(),
        folds: 3,
        runs: 2,
        workers: 2,
        forest: ForestConfig {
            n_estimators: 10,
            seed: Some(5),
            ..ForestConfig::default()
        },
        ..BenchmarkConfig::default()
    };
    let reports = run_benchmark(&config).unwrap();

    assert_eq!(reports.len(), 2);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.run_index, i);
        assert_eq!(report.model, "R.Forest");
        assert_eq!(report.fold_accuracies.len(), 3);
        // 40% of 30 rows per class held out
        assert_eq!(report.confusion.total(), 36);
        assert!(report.cv_accuracy > 0.9, "cv accuracy {}", report.cv_accuracy);
        assert!(report.validation.accuracy > 0.9);
    }
    assert!(reports[0].render().contains("macro avg"));
}

#[test]
fn test_missing_capture_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("Flow");
    write_captures(&raw_dir, 3);
    std::fs::remove_file(raw_dir.join("flow-netatmo.csv")).unwrap();

    let sources = sources(&raw_dir, dir.path());
    let err = label_sources(&sources).unwrap_err();
    assert!(matches!(err, PipelineError::MissingInputFile { .. }));
    assert!(sources.iter().all(|s| !s.output.exists()));
}

#[test]
fn test_malformed_merged_row_aborts_aggregation() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("logFlow.csv");
    std::fs::write(&input, "10,1,laptop\n20,two,laptop\n").unwrap();

    let config = AggregateConfig {
        input,
        output: dir.path().join("flowLabel.csv"),
        window_size: 2,
    };
    let err = aggregate_file(&config).unwrap_err();
    assert!(matches!(err, PipelineError::MalformedRecord { line: 2, .. }));
    assert!(!config.output.exists());
}

#[test]
fn test_reshape_default_layout() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("zum3.txt");
    std::fs::write(&input, "1,2,3,4,5,6,7\n3,2,3,4,5,6,9\n").unwrap();

    let config = ReshapeConfig {
        input,
        output: dir.path().join("report.csv"),
        schema: ReshapeSchema::default(),
    };
    assert_eq!(reshape_file(&config).unwrap(), 2);

    let written = std::fs::read_to_string(&config.output).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert!(lines[0].starts_with(",NB,desvioNB,desvioNB.1,CART,desvioC,desvioC.1,R.Forest"));
    assert!(lines[0].ends_with("Adaboost,desvioAda,desvioAda.1"));
    let first: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(first.len(), 22);
    assert_eq!(first[0], "0");
    assert_eq!(first[1], "1");
    let std_nb: f64 = first[2].parse().unwrap();
    assert!((std_nb - 2f64.sqrt()).abs() < 1e-12);
    assert_eq!(first[5], "0");
}
