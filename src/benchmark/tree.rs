//! CART decision tree with Gini impurity.
//!
//! Nodes live in a flat arena addressed by index. Splits send rows with
//! `value <= threshold` to the left child.

use crate::benchmark::classifier::Classifier;
use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features examined per split; `None` examines all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

/// A fitted (or empty) classification tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    params: TreeParams,
    nodes: Vec<Node>,
    n_classes: usize,
    seed: u64,
}

impl DecisionTree {
    pub fn new(params: TreeParams, seed: u64) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            n_classes: 0,
            seed,
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Grow the tree on the rows named by `indices` (repeats allowed).
    pub fn fit_indices(
        &mut self,
        features: &[Vec<f64>],
        labels: &[usize],
        indices: &[usize],
        n_classes: usize,
        rng: &mut StdRng,
    ) -> Result<()> {
        validate_training_set(features, labels, n_classes)?;
        if indices.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "cannot fit a tree on zero rows".to_string(),
            ));
        }

        self.nodes.clear();
        self.n_classes = n_classes;
        let mut rows = indices.to_vec();
        let mut builder = Builder {
            x: features,
            y: labels,
            n_classes,
            n_features: features[0].len(),
            params: self.params,
            rng,
            nodes: &mut self.nodes,
        };
        builder.grow(&mut rows, 0);
        Ok(())
    }

    fn leaf_for(&self, row: &[f64]) -> &[f64] {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &str {
        "CART"
    }

    fn fit(&mut self, features: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Result<()> {
        let indices: Vec<usize> = (0..labels.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.fit_indices(features, labels, &indices, n_classes, &mut rng)
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        if self.nodes.is_empty() {
            return vec![0.0; self.n_classes];
        }
        self.leaf_for(row).to_vec()
    }
}

/// Shared input checks for tree and forest training.
pub(crate) fn validate_training_set(
    features: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
) -> Result<()> {
    if features.is_empty() {
        return Err(PipelineError::InvalidParameter(
            "training set is empty".to_string(),
        ));
    }
    if features.len() != labels.len() {
        return Err(PipelineError::SchemaMismatch(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }
    let width = features[0].len();
    if width == 0 || features.iter().any(|row| row.len() != width) {
        return Err(PipelineError::SchemaMismatch(
            "feature rows must share a non-zero width".to_string(),
        ));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
        return Err(PipelineError::InvalidParameter(format!(
            "label {bad} outside 0..{n_classes}"
        )));
    }
    Ok(())
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    params: TreeParams,
    rng: &'a mut StdRng,
    nodes: &'a mut Vec<Node>,
}

impl Builder<'_> {
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let mut counts = vec![0usize; self.n_classes];
        for &i in rows.iter() {
            counts[self.y[i]] += 1;
        }
        let n = rows.len();
        let impurity = gini(&counts, n);

        let at = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / n as f64).collect(),
        });

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if impurity <= 0.0 || n < self.params.min_samples_split.max(2) || depth_reached {
            return at;
        }

        let Some(split) = self.best_split(rows, &counts) else {
            return at;
        };

        let mid = partition(rows, |i| self.x[i][split.feature] <= split.threshold);
        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);

        self.nodes[at] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        at
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        match self.params.max_features {
            Some(m) if m > 0 && m < self.n_features => {
                rand::seq::index::sample(&mut *self.rng, self.n_features, m).into_vec()
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn best_split(&mut self, rows: &[usize], counts: &[usize]) -> Option<BestSplit> {
        let n = rows.len();
        let mut best: Option<BestSplit> = None;
        let mut sorted = rows.to_vec();

        for feature in self.candidate_features() {
            let x = self.x;
            sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();

            for pos in 0..n - 1 {
                let class = self.y[sorted[pos]];
                left[class] += 1;
                right[class] -= 1;

                let here = x[sorted[pos]][feature];
                let next = x[sorted[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                let score = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;

                if best.map_or(true, |b| score < b.score) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        score,
                    });
                }
            }
        }

        best
    }
}

/// Reorder `rows` so every element satisfying `pred` comes first; returns
/// the number of such elements.
fn partition(rows: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for i in 0..rows.len() {
        if pred(rows[i]) {
            rows.swap(i, mid);
            mid += 1;
        }
    }
    mid
}
