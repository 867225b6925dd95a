//! Random forest: bootstrap-sampled CART trees trained in parallel.
//!
//! Each tree draws its own seed from the forest seed up front, so a seeded
//! forest is reproducible regardless of how rayon schedules the trees.

use crate::benchmark::classifier::Classifier;
use crate::benchmark::tree::{validate_training_set, DecisionTree, TreeParams};
use crate::error::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of features examined at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`
    Sqrt,
    All,
    Fixed(usize),
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let m = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(m) => *m,
        };
        m.clamp(1, n_features.max(1))
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    /// Draw a bootstrap sample per tree instead of using every row
    pub bootstrap: bool,
    /// Fixed seed; `None` draws a fresh seed for every forest
    pub seed: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: None,
        }
    }
}

/// Ensemble of decision trees voting by averaged class probabilities.
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    seed: u64,
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    pub fn new(config: ForestConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            trees: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "R.Forest"
    }

    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Result<()> {
        validate_training_set(features, labels, n_classes)?;

        let n_rows = labels.len();
        let params = TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            max_features: Some(self.config.max_features.resolve(features[0].len())),
        };

        let mut master = StdRng::seed_from_u64(self.seed);
        let seeds: Vec<u64> = (0..self.config.n_estimators).map(|_| master.gen()).collect();
        let bootstrap = self.config.bootstrap;

        let trees: Result<Vec<DecisionTree>> = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let indices: Vec<usize> = if bootstrap {
                    (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
                } else {
                    (0..n_rows).collect()
                };
                let mut tree = DecisionTree::new(params, seed);
                tree.fit_indices(features, labels, &indices, n_classes, &mut rng)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        self.n_classes = n_classes;
        Ok(())
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut total = vec![0.0; self.n_classes];
        if self.trees.is_empty() {
            return total;
        }
        for tree in &self.trees {
            for (sum, p) in total.iter_mut().zip(tree.predict_proba(row)) {
                *sum += p;
            }
        }
        let n = self.trees.len() as f64;
        total.iter_mut().for_each(|p| *p /= n);
        total
    }
}
