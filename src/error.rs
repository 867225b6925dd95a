//! Error types shared by every pipeline stage.

use crate::dataset::Category;
use std::path::PathBuf;

/// Errors raised while labeling, aggregating, benchmarking or reshaping.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Input file not found: {}", path.display())]
    MissingInputFile { path: PathBuf },

    #[error("Malformed record at {}:{line}: {reason}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// More rows of a category than precomputed feature tuples.
    #[error("Feature queue for {category} exhausted at row {row}")]
    CategoryQueueExhausted { category: Category, row: u64 },

    /// Feature tuples left over once every row has been joined.
    #[error("{remaining} feature tuple(s) for {category} were never consumed")]
    UnconsumedFeatures { category: Category, remaining: usize },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// Wrap an I/O error, mapping `NotFound` to [`PipelineError::MissingInputFile`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            PipelineError::MissingInputFile { path }
        } else {
            PipelineError::Io { path, source }
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        PipelineError::MalformedRecord {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
