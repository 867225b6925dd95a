//! The seam between the benchmark runner and a classification algorithm.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classifier benchmarked by the runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    RandomForest,
    /// A single CART decision tree
    Cart,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::Cart => "cart",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown model '{0}' (expected random_forest or cart)")]
pub struct UnknownModel(String);

impl FromStr for ModelKind {
    type Err = UnknownModel;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "rf" => Ok(ModelKind::RandomForest),
            "cart" => Ok(ModelKind::Cart),
            _ => Err(UnknownModel(s.to_string())),
        }
    }
}

/// A multi-class classifier over dense `f64` feature rows.
///
/// Labels are class indices in `0..n_classes`.
pub trait Classifier: Send {
    /// Short name used in reports.
    fn name(&self) -> &str;

    /// Train on `features`/`labels`, discarding any previous fit.
    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Result<()>;

    /// Class probability distribution for one row.
    fn predict_proba(&self, row: &[f64]) -> Vec<f64>;

    /// Most probable class for each row.
    fn predict(&self, features: &[Vec<f64>]) -> Vec<usize> {
        features
            .iter()
            .map(|row| argmax(&self.predict_proba(row)))
            .collect()
    }
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
