//! IoT Flow Bench - labeling, feature aggregation and classifier benchmarking
//! for per-device IoT network flow captures.
//!
//! Raw captures hold one `bytes_out,packets` row per flow, one file per
//! device category. The toolkit turns them into a labeled feature table and
//! measures how well a random forest separates the categories.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          IoT Flow Bench                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌────────────┐   │
//! │  │ Labeler  │──▶│  Merger  │──▶│ Aggregator │──▶│ Benchmark  │   │
//! │  │ (append  │   │ (concat) │   │ (windowed  │   │ (forest,   │   │
//! │  │  token)  │   │          │   │  features) │   │  k-fold)   │   │
//! │  └──────────┘   └──────────┘   └────────────┘   └────────────┘   │
//! │        │                              │               │          │
//! │        ▼                              ▼               ▼          │
//! │  ┌────────────────────────────────────────────┐  ┌──────────┐    │
//! │  │                  Run Log                   │  │ Reshaper │    │
//! │  └────────────────────────────────────────────┘  └──────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use iot_flow_bench::{aggregator, config::Config};
//!
//! let config = Config::load().unwrap_or_default();
//! let summary = aggregator::aggregate_file(&config.aggregate).expect("aggregation failed");
//! println!("{} rows", summary.rows);
//! ```

pub mod aggregator;
pub mod audit;
pub mod benchmark;
pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod labeler;
pub mod reshape;

// Re-export key types at crate root for convenience
pub use aggregator::{aggregate_file, AggregateSummary};
pub use audit::{BenchmarkSummary, RunLog, StageCounters};
pub use benchmark::{run_benchmark, Classifier, ModelKind, RandomForest, RunReport};
pub use config::{Config, ConfigError};
pub use crate::core::{aggregate_records, AggregatedRecord, FeatureSet, FeatureTuple, WindowStat};
pub use dataset::{Category, FlowRecord, LabeledRecord};
pub use error::{PipelineError, Result};
pub use labeler::{label_sources, merge_files, LabelStats};
pub use reshape::{reshape_file, ReshapeSchema};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
