//! Classifier benchmark over the aggregated feature table.
//!
//! This module contains:
//! - Loading the feature table as a labeled matrix
//! - Stratified train/validation splitting and k-fold partitioning
//! - The `Classifier` seam with CART tree and random forest implementations
//! - Metrics and the text report
//! - Repeated runs on a worker pool

pub mod classifier;
pub mod forest;
pub mod metrics;
pub mod runner;
pub mod split;
pub mod table;
pub mod tree;

// Re-export commonly used types
pub use classifier::{Classifier, ModelKind};
pub use forest::{ForestConfig, MaxFeatures, RandomForest};
pub use metrics::{classification_report, ConfusionMatrix, Scores};
pub use runner::{run_benchmark, run_once, run_repeated, RunReport};
pub use split::{k_fold, train_validation_split, Fold, SplitStrategy, TrainValidation};
pub use table::{FeatureTable, FEATURE_COLUMNS, N_FEATURES};
pub use tree::{DecisionTree, TreeParams};
