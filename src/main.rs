//! IoT Flow Bench CLI
//!
//! Labels device captures, aggregates windowed features and benchmarks a
//! classifier on them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iot_flow_bench::{
    aggregator::aggregate_file,
    audit::RunLog,
    benchmark::{run_benchmark, ModelKind},
    config::Config,
    labeler::{label_sources, merge_files},
    reshape::reshape_file,
    VERSION,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iot-flow")]
#[command(version = VERSION)]
#[command(about = "Label IoT flow captures, aggregate windowed features and benchmark a classifier", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append the category token to every row of each configured capture
    Label,

    /// Concatenate labeled files into the aggregator input
    Merge {
        /// Files to merge, in order (defaults to the labeler outputs)
        inputs: Vec<PathBuf>,

        /// Merged file (defaults to label.merged_output)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Compute windowed features and write the feature table
    Aggregate {
        #[arg(long, short)]
        input: Option<PathBuf>,

        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Records per window
        #[arg(long)]
        window: Option<usize>,
    },

    /// Benchmark a classifier on the feature table
    Benchmark {
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Classifier to benchmark (random_forest or cart)
        #[arg(long)]
        model: Option<ModelKind>,

        /// Independent repetitions
        #[arg(long)]
        runs: Option<usize>,

        /// Worker threads for the repetitions
        #[arg(long)]
        workers: Option<usize>,

        /// Trees per forest
        #[arg(long)]
        trees: Option<usize>,

        /// Fixed forest seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Add standard-deviation columns to a results table
    Reshape {
        #[arg(long, short)]
        input: Option<PathBuf>,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Label, merge, aggregate and benchmark in one pass
    Run,

    /// Show cumulative run statistics
    Status,

    /// Show configuration
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Install the fmt subscriber. `--verbose` wins over `RUST_LOG`.
fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(Config::config_path);

    if let Commands::Config { init } = cli.command {
        return cmd_config(&config_path, init);
    }

    let config = Config::load_from(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;
    config.validate().context("invalid configuration")?;

    run_command(cli.command, config, &config_path)
}

/// Execute `command`, saving the run log whether or not it succeeded.
fn run_command(command: Commands, mut config: Config, config_path: &Path) -> Result<()> {
    let mut run_log = RunLog::open(config.run_log_path());
    let outcome = execute(command, &mut config, config_path, &mut run_log);

    if let Err(e) = run_log.save() {
        warn!(error = %e, "Could not save run log");
    }
    outcome
}

fn execute(
    command: Commands,
    config: &mut Config,
    config_path: &Path,
    run_log: &mut RunLog,
) -> Result<()> {
    match command {
        Commands::Label => cmd_label(config, run_log)?,
        Commands::Merge { inputs, output } => {
            let inputs = if inputs.is_empty() {
                config.label.sources.iter().map(|s| s.output.clone()).collect()
            } else {
                inputs
            };
            let output = output.unwrap_or_else(|| config.label.merged_output.clone());
            cmd_merge(&inputs, &output, run_log)?;
        }
        Commands::Aggregate {
            input,
            output,
            window,
        } => {
            if let Some(input) = input {
                config.aggregate.input = input;
            }
            if let Some(output) = output {
                config.aggregate.output = output;
            }
            if let Some(window) = window {
                config.aggregate.window_size = window;
            }
            config.validate().context("invalid aggregate options")?;
            cmd_aggregate(config, run_log)?;
        }
        Commands::Benchmark {
            input,
            model,
            runs,
            workers,
            trees,
            seed,
        } => {
            let bench = &mut config.benchmark;
            if let Some(input) = input {
                bench.input = input;
            }
            if let Some(model) = model {
                bench.model = model;
            }
            if let Some(runs) = runs {
                bench.runs = runs;
            }
            if let Some(workers) = workers {
                bench.workers = workers;
            }
            if let Some(trees) = trees {
                bench.forest.n_estimators = trees;
            }
            if seed.is_some() {
                bench.forest.seed = seed;
            }
            config.validate().context("invalid benchmark options")?;
            cmd_benchmark(config, run_log)?;
        }
        Commands::Reshape { input, output } => {
            if let Some(input) = input {
                config.reshape.input = input;
            }
            if let Some(output) = output {
                config.reshape.output = output;
            }
            let rows = reshape_file(&config.reshape).context("reshape failed")?;
            run_log.record_reshaped(&config.reshape.output, rows);
            println!("Reshaped {rows} rows -> {}", config.reshape.output.display());
        }
        Commands::Run => {
            // Chain each stage's output into the next stage's input
            config.aggregate.input = config.label.merged_output.clone();
            config.benchmark.input = config.aggregate.output.clone();

            cmd_label(config, run_log)?;
            let outputs: Vec<PathBuf> = config
                .label
                .sources
                .iter()
                .map(|s| s.output.clone())
                .collect();
            cmd_merge(&outputs, &config.label.merged_output, run_log)?;
            cmd_aggregate(config, run_log)?;
            cmd_benchmark(config, run_log)?;
        }
        Commands::Status => cmd_status(config, config_path, run_log),
        // Handled before the configuration is loaded
        Commands::Config { .. } => {}
    }
    Ok(())
}

fn cmd_label(config: &Config, run_log: &mut RunLog) -> Result<()> {
    let stats = label_sources(&config.label.sources).context("labeling failed")?;
    run_log.record_labeled(&stats);

    let rows: usize = stats.iter().map(|s| s.rows).sum();
    for s in &stats {
        println!("  {:<14} {:>8} rows -> {}", s.category, s.rows, s.output.display());
    }
    println!("Labeled {} file(s), {rows} rows", stats.len());
    Ok(())
}

fn cmd_merge(inputs: &[PathBuf], output: &Path, run_log: &mut RunLog) -> Result<()> {
    let lines = merge_files(inputs, output).context("merge failed")?;
    run_log.record_merged(output, lines);
    println!("Merged {} file(s), {lines} rows -> {}", inputs.len(), output.display());
    Ok(())
}

fn cmd_aggregate(config: &Config, run_log: &mut RunLog) -> Result<()> {
    let summary = aggregate_file(&config.aggregate)
        .with_context(|| format!("aggregation of {} failed", config.aggregate.input.display()))?;
    run_log.record_aggregated(&config.aggregate.output, &summary);

    for (category, rows) in &summary.per_category {
        println!("  {category:<14} {rows:>8} rows");
    }
    println!(
        "Aggregated {} rows -> {}",
        summary.rows,
        config.aggregate.output.display()
    );
    Ok(())
}

fn cmd_benchmark(config: &Config, run_log: &mut RunLog) -> Result<()> {
    info!(input = %config.benchmark.input.display(), "Loading feature table");
    let reports = run_benchmark(&config.benchmark).context("benchmark failed")?;
    run_log.record_benchmark(&config.benchmark.input, &reports);

    for report in &reports {
        println!("{}", report.render());
    }
    Ok(())
}

fn cmd_status(config: &Config, config_path: &Path, run_log: &RunLog) {
    println!("IoT Flow Bench v{VERSION}");
    println!("======================");
    println!();
    println!("Config file: {}", config_path.display());
    println!("Run log:     {}", config.run_log_path().display());
    println!();
    println!("Pipeline:");
    println!("  Capture sources:  {}", config.label.sources.len());
    println!("  Merged file:      {}", config.label.merged_output.display());
    println!("  Feature table:    {}", config.aggregate.output.display());
    println!("  Window size:      {}", config.aggregate.window_size);
    println!(
        "  Benchmark:        {} x{} run(s) on {} worker(s), {} folds",
        config.benchmark.model,
        config.benchmark.runs,
        config.benchmark.workers,
        config.benchmark.folds
    );
    println!();
    println!("{}", run_log.summary());
}

fn cmd_config(config_path: &Path, init: bool) -> Result<()> {
    if init {
        Config::default()
            .save_to(config_path)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!("Wrote default configuration to {}", config_path.display());
        return Ok(());
    }

    let config = Config::load_from(config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", config_path.display());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("failed to serialize configuration")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_flow_bench::{config::LabelSource, Category};

    #[test]
    fn test_run_log_kept_when_a_later_stage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("flow-laptop.csv");
        // One field per row: labeling succeeds, aggregation rejects the rows
        std::fs::write(&raw, "10\n20\n").unwrap();

        let mut config = Config::default();
        config.label.sources = vec![LabelSource {
            category: Category::Laptop,
            input: raw,
            output: dir.path().join("labeled.csv"),
        }];
        config.label.merged_output = dir.path().join("merged.csv");
        config.aggregate.output = dir.path().join("features.csv");
        config.data_path = dir.path().join("data");

        let err = run_command(Commands::Run, config.clone(), &dir.path().join("config.json"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("aggregation"));

        let log = RunLog::open(config.run_log_path());
        assert_eq!(log.counters.files_labeled, 1);
        assert_eq!(log.counters.rows_labeled, 2);
        assert_eq!(log.counters.merges, 1);
        assert!(log.feature_table.is_none());
    }

    #[test]
    fn test_model_flag_parses() {
        let cli = Cli::try_parse_from(["iot-flow", "benchmark", "--model", "cart"]).unwrap();
        match cli.command {
            Commands::Benchmark { model, .. } => assert_eq!(model, Some(ModelKind::Cart)),
            _ => panic!("expected the benchmark command"),
        }
    }
}
