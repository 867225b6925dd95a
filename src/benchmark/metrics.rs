//! Classification metrics over predicted and true class indices.
//!
//! Macro averages cover the classes present in either the truth or the
//! predictions. A class with no predicted (or no true) rows contributes a
//! precision (or recall) of zero.

use crate::dataset::Category;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Square confusion matrix; rows are true classes, columns predictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Class indices covered, ascending
    pub classes: Vec<usize>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(truth: &[usize], predicted: &[usize]) -> Self {
        let mut classes: Vec<usize> = truth.iter().chain(predicted).copied().collect();
        classes.sort_unstable();
        classes.dedup();

        let position = |class: usize| classes.binary_search(&class).unwrap_or(0);
        let mut counts = vec![vec![0; classes.len()]; classes.len()];
        for (&t, &p) in truth.iter().zip(predicted) {
            counts[position(t)][position(p)] += 1;
        }
        Self { classes, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    fn true_positives(&self, k: usize) -> usize {
        self.counts[k][k]
    }

    /// Rows whose true class is at position `k`.
    pub fn support(&self, k: usize) -> usize {
        self.counts[k].iter().sum()
    }

    fn predicted_count(&self, k: usize) -> usize {
        self.counts.iter().map(|row| row[k]).sum()
    }

    pub fn precision(&self, k: usize) -> f64 {
        ratio(self.true_positives(k), self.predicted_count(k))
    }

    pub fn recall(&self, k: usize) -> f64 {
        ratio(self.true_positives(k), self.support(k))
    }

    pub fn f1(&self, k: usize) -> f64 {
        let p = self.precision(k);
        let r = self.recall(k);
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Diagonal of the row-normalized matrix (NaN for a class never true).
    pub fn normalized_diagonal(&self) -> Vec<f64> {
        (0..self.classes.len())
            .map(|k| {
                let support = self.support(k);
                if support == 0 {
                    f64::NAN
                } else {
                    self.true_positives(k) as f64 / support as f64
                }
            })
            .collect()
    }

    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.classes.len()).map(|k| self.true_positives(k)).sum();
        ratio(correct, self.total())
    }

    fn macro_average(&self, metric: impl Fn(usize) -> f64) -> f64 {
        if self.classes.is_empty() {
            return 0.0;
        }
        (0..self.classes.len()).map(metric).sum::<f64>() / self.classes.len() as f64
    }

    fn weighted_average(&self, metric: impl Fn(usize) -> f64) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (0..self.classes.len())
            .map(|k| metric(k) * self.support(k) as f64)
            .sum::<f64>()
            / total as f64
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Headline scores of one held-out evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub accuracy: f64,
    pub f1_macro: f64,
    pub precision_macro: f64,
    pub recall_macro: f64,
}

impl Scores {
    pub fn from_matrix(cm: &ConfusionMatrix) -> Self {
        Self {
            accuracy: cm.accuracy(),
            f1_macro: cm.macro_average(|k| cm.f1(k)),
            precision_macro: cm.macro_average(|k| cm.precision(k)),
            recall_macro: cm.macro_average(|k| cm.recall(k)),
        }
    }
}

/// Per-class precision/recall/F1/support table followed by accuracy, macro
/// and weighted averages.
pub fn classification_report(cm: &ConfusionMatrix, digits: usize) -> String {
    let names: Vec<String> = cm
        .classes
        .iter()
        .map(|&c| {
            Category::from_index(c)
                .map(|cat| cat.to_string())
                .unwrap_or_else(|| c.to_string())
        })
        .collect();
    let width = names
        .iter()
        .map(|n| n.len())
        .chain(std::iter::once("weighted avg".len()))
        .max()
        .unwrap_or(0);
    let col = digits.max(9) + 1;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>width$} {:>col$} {:>col$} {:>col$} {:>col$}\n",
        "", "precision", "recall", "f1-score", "support"
    );
    for (k, name) in names.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>width$} {:>col$.digits$} {:>col$.digits$} {:>col$.digits$} {:>col$}",
            name,
            cm.precision(k),
            cm.recall(k),
            cm.f1(k),
            cm.support(k)
        );
    }
    out.push('\n');

    let total = cm.total();
    let _ = writeln!(
        out,
        "{:>width$} {:>col$} {:>col$} {:>col$.digits$} {:>col$}",
        "accuracy",
        "",
        "",
        cm.accuracy(),
        total
    );
    let average_rows = [
        (
            "macro avg",
            cm.macro_average(|k| cm.precision(k)),
            cm.macro_average(|k| cm.recall(k)),
            cm.macro_average(|k| cm.f1(k)),
        ),
        (
            "weighted avg",
            cm.weighted_average(|k| cm.precision(k)),
            cm.weighted_average(|k| cm.recall(k)),
            cm.weighted_average(|k| cm.f1(k)),
        ),
    ];
    for (label, precision, recall, f1) in average_rows {
        let _ = writeln!(
            out,
            "{:>width$} {:>col$.digits$} {:>col$.digits$} {:>col$.digits$} {:>col$}",
            label, precision, recall, f1, total
        );
    }
    out
}
