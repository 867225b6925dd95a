//! Configuration for the flow toolkit.
//!
//! Every stage takes its paths and parameters from here instead of hardcoded
//! constants. Defaults reproduce the historical file layout.

use crate::benchmark::{ForestConfig, ModelKind, SplitStrategy};
use crate::core::DEFAULT_WINDOW_SIZE;
use crate::dataset::Category;
use crate::reshape::ReshapeSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub label: LabelConfig,
    pub aggregate: AggregateConfig,
    pub benchmark: BenchmarkConfig,
    pub reshape: ReshapeConfig,

    /// Path for the persisted run log
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("iot-flow-bench");

        Self {
            label: LabelConfig::default(),
            aggregate: AggregateConfig::default(),
            benchmark: BenchmarkConfig::default(),
            reshape: ReshapeConfig::default(),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("iot-flow-bench")
            .join("config.json")
    }

    /// Path of the persisted run log.
    pub fn run_log_path(&self) -> PathBuf {
        self.data_path.join("run_log.json")
    }

    /// Reject parameter combinations no stage can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregate.window_size == 0 {
            return Err(ConfigError::Invalid("aggregate.window_size must be at least 1".into()));
        }

        let bench = &self.benchmark;
        if !(bench.validation_size > 0.0 && bench.validation_size < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "benchmark.validation_size must be in (0, 1), got {}",
                bench.validation_size
            )));
        }
        if bench.folds < 2 {
            return Err(ConfigError::Invalid("benchmark.folds must be at least 2".into()));
        }
        if bench.runs == 0 || bench.workers == 0 {
            return Err(ConfigError::Invalid(
                "benchmark.runs and benchmark.workers must be at least 1".into(),
            ));
        }
        if bench.forest.n_estimators == 0 {
            return Err(ConfigError::Invalid(
                "benchmark.forest.n_estimators must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// One raw capture file and the category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSource {
    pub category: Category,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl LabelSource {
    /// The historical `Flow/flow-<category>.csv` -> `flow-<category>.csv` layout.
    pub fn conventional(category: Category, input_dir: &Path, output_dir: &Path) -> Self {
        let file = format!("flow-{category}.csv");
        Self {
            category,
            input: input_dir.join(&file),
            output: output_dir.join(file),
        }
    }
}

/// Labeler and merger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    pub sources: Vec<LabelSource>,
    /// Concatenation of every labeled output
    pub merged_output: PathBuf,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            sources: Category::ALL
                .iter()
                .map(|&c| LabelSource::conventional(c, Path::new("Flow"), Path::new(".")))
                .collect(),
            merged_output: PathBuf::from("FlowComLabel/logFlow.csv"),
        }
    }
}

/// Feature aggregator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub window_size: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("FlowComLabel/logFlow.csv"),
            output: PathBuf::from("FlowComLabel/flowLabel.csv"),
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Benchmark runner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub input: PathBuf,
    /// Fraction of rows held out for validation
    pub validation_size: f64,
    pub split_seed: u64,
    pub split: SplitStrategy,
    /// Number of cross-validation folds on the training partition
    pub folds: usize,
    /// Independent repetitions of the whole benchmark
    pub runs: usize,
    /// Worker threads executing repetitions
    pub workers: usize,
    #[serde(default)]
    pub model: ModelKind,
    /// Forest parameters; a CART model uses its depth and split limits
    pub forest: ForestConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("FlowComLabel/flowLabel.csv"),
            validation_size: 0.40,
            split_seed: 7,
            split: SplitStrategy::Stratified,
            folds: 9,
            runs: 2,
            workers: 4,
            model: ModelKind::RandomForest,
            forest: ForestConfig::default(),
        }
    }
}

/// Report reshaper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReshapeConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub schema: ReshapeSchema,
}

impl Default for ReshapeConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("zum3.txt"),
            output: PathBuf::from("DatasetTimeHandoutPacket.csv"),
            schema: ReshapeSchema::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
