//! Train/validation splitting and k-fold partitioning.

use crate::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How rows are assigned to the validation partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Each class contributes the same fraction to validation
    Stratified,
    /// One global shuffle
    Shuffled,
}

/// Row indices of a train/validation split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainValidation {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Split `labels.len()` rows, holding out `validation_size` of them.
///
/// The same seed always produces the same split.
pub fn train_validation_split(
    labels: &[usize],
    validation_size: f64,
    seed: u64,
    strategy: SplitStrategy,
) -> Result<TrainValidation> {
    if !(validation_size > 0.0 && validation_size < 1.0) {
        return Err(PipelineError::InvalidParameter(format!(
            "validation size must be in (0, 1), got {validation_size}"
        )));
    }
    let n = labels.len();
    if n < 2 {
        return Err(PipelineError::InvalidParameter(format!(
            "need at least 2 rows to split, got {n}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let (mut train, mut validation) = match strategy {
        SplitStrategy::Shuffled => {
            let mut indices: Vec<usize> = (0..n).collect();
            indices.shuffle(&mut rng);
            let n_validation = held_out(n, validation_size);
            let train = indices.split_off(n_validation);
            (train, indices)
        }
        SplitStrategy::Stratified => {
            let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (i, &label) in labels.iter().enumerate() {
                by_class.entry(label).or_default().push(i);
            }

            let mut train = Vec::with_capacity(n);
            let mut validation = Vec::new();
            for (_, mut indices) in by_class {
                indices.shuffle(&mut rng);
                let n_validation = if indices.len() < 2 {
                    0
                } else {
                    held_out(indices.len(), validation_size)
                };
                let rest = indices.split_off(n_validation);
                validation.extend(indices);
                train.extend(rest);
            }
            train.shuffle(&mut rng);
            validation.shuffle(&mut rng);
            (train, validation)
        }
    };

    if train.is_empty() || validation.is_empty() {
        return Err(PipelineError::InvalidParameter(format!(
            "split of {n} rows left an empty partition"
        )));
    }
    train.shrink_to_fit();
    validation.shrink_to_fit();
    Ok(TrainValidation { train, validation })
}

/// Rows to hold out from `n`, rounded up, at least one and leaving at least one.
fn held_out(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).ceil() as usize).clamp(1, n - 1)
}

/// One cross-validation fold: positions into the training partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Contiguous, unshuffled k-fold partition of `n` rows.
///
/// The first `n % k` folds get one extra row.
pub fn k_fold(n: usize, k: usize) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(PipelineError::InvalidParameter(format!(
            "k-fold needs at least 2 folds, got {k}"
        )));
    }
    if n < k {
        return Err(PipelineError::InvalidParameter(format!(
            "cannot make {k} folds from {n} rows"
        )));
    }

    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let end = start + size;
        folds.push(Fold {
            train: (0..start).chain(end..n).collect(),
            test: (start..end).collect(),
        });
        start = end;
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_is_a_partition() {
        let labels: Vec<usize> = (0..50).map(|i| i % 3).collect();
        for strategy in [SplitStrategy::Stratified, SplitStrategy::Shuffled] {
            let split = train_validation_split(&labels, 0.4, 7, strategy).unwrap();
            let mut all: Vec<usize> = split.train.iter().chain(&split.validation).copied().collect();
            all.sort_unstable();
            assert_eq!(all, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_shuffled_split_size() {
        let labels = vec![0; 100];
        let split = train_validation_split(&labels, 0.4, 7, SplitStrategy::Shuffled).unwrap();
        assert_eq!(split.validation.len(), 40);
        assert_eq!(split.train.len(), 60);
    }

    #[test]
    fn test_stratified_keeps_class_ratio() {
        // 60 rows of class 0, 40 rows of class 1
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i >= 60)).collect();
        let split = train_validation_split(&labels, 0.4, 7, SplitStrategy::Stratified).unwrap();

        let count = |rows: &[usize], class: usize| rows.iter().filter(|&&i| labels[i] == class).count();
        assert_eq!(count(&split.validation, 0), 24);
        assert_eq!(count(&split.validation, 1), 16);
        assert_eq!(count(&split.train, 0), 36);
        assert_eq!(count(&split.train, 1), 24);
    }

    #[test]
    fn test_held_out_rounds_up() {
        // 3 * 0.4 = 1.2 rows -> 2 held out
        let split = train_validation_split(&[0, 0, 0], 0.4, 7, SplitStrategy::Shuffled).unwrap();
        assert_eq!(split.validation.len(), 2);
        assert_eq!(split.train.len(), 1);

        // 5 * 0.3 = 1.5 per class -> 2 each
        let labels: Vec<usize> = (0..10).map(|i| i / 5).collect();
        let split = train_validation_split(&labels, 0.3, 7, SplitStrategy::Stratified).unwrap();
        assert_eq!(split.validation.len(), 4);
    }

    #[test]
    fn test_split_is_deterministic() {
        let labels: Vec<usize> = (0..30).map(|i| i % 2).collect();
        let a = train_validation_split(&labels, 0.4, 7, SplitStrategy::Stratified).unwrap();
        let b = train_validation_split(&labels, 0.4, 7, SplitStrategy::Stratified).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(train_validation_split(&[0, 1, 0], 0.0, 7, SplitStrategy::Shuffled).is_err());
        assert!(train_validation_split(&[0, 1, 0], 1.5, 7, SplitStrategy::Shuffled).is_err());
        assert!(train_validation_split(&[0], 0.4, 7, SplitStrategy::Shuffled).is_err());
    }

    #[test]
    fn test_k_fold_covers_every_row_once() {
        let folds = k_fold(20, 9).unwrap();
        assert_eq!(folds.len(), 9);

        let mut seen = HashSet::new();
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 20);
            for &i in &fold.test {
                assert!(seen.insert(i), "row {i} tested twice");
                assert!(!fold.train.contains(&i));
            }
        }
        assert_eq!(seen.len(), 20);

        // 20 = 9 * 2 + 2: first two folds carry three rows
        assert_eq!(folds[0].test, vec![0, 1, 2]);
        assert_eq!(folds[1].test, vec![3, 4, 5]);
        assert_eq!(folds[2].test, vec![6, 7]);
    }

    #[test]
    fn test_k_fold_rejects_too_few_rows() {
        assert!(k_fold(5, 9).is_err());
        assert!(k_fold(5, 1).is_err());
    }
}
