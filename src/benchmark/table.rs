//! The aggregated feature table as a classifier dataset.

use crate::dataset::Category;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Feature columns fed to the classifier, in matrix order.
pub const FEATURE_COLUMNS: [&str; 6] = ["bytes_out", "packets", "average", "min", "max", "vari"];

/// Number of feature columns.
pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

#[derive(Debug, Deserialize)]
struct FeatureRow {
    bytes_out: f64,
    packets: f64,
    #[serde(rename = "type")]
    category: Category,
    average: f64,
    min: f64,
    max: f64,
    vari: f64,
}

/// Feature matrix with one class label per row.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<Category>,
}

impl FeatureTable {
    /// Load a feature table written by the aggregator (header required).
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
        Self::from_reader(file, path)
    }

    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = rdr.headers()?.clone();
        for column in FEATURE_COLUMNS.iter().chain(std::iter::once(&"type")) {
            if !headers.iter().any(|h| h == *column) {
                return Err(PipelineError::SchemaMismatch(format!(
                    "{} has no '{column}' column",
                    origin.display()
                )));
            }
        }

        let mut table = FeatureTable::default();
        for (i, result) in rdr.deserialize::<FeatureRow>().enumerate() {
            // Header is line 1
            let row = result.map_err(|e| {
                PipelineError::malformed(origin, i as u64 + 2, e.to_string())
            })?;
            table.push(
                vec![
                    row.bytes_out,
                    row.packets,
                    row.average,
                    row.min,
                    row.max,
                    row.vari,
                ],
                row.category,
            );
        }
        Ok(table)
    }

    pub fn push(&mut self, features: Vec<f64>, label: Category) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows selected by `indices`, in the given order.
    pub fn subset(&self, indices: &[usize]) -> FeatureTable {
        FeatureTable {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Class indices of every row.
    pub fn class_indices(&self) -> Vec<usize> {
        self.labels.iter().map(|c| c.index()).collect()
    }
}
