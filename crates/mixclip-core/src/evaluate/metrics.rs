//! Accuracy, confusion matrices, and per-class precision/recall reports.

use serde::Serialize;
use std::fmt;

/// Fraction of predictions equal to the true label. Empty input gives 0.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    correct as f64 / y_true.len() as f64
}

/// `n_classes × n_classes` counts; rows are true labels, columns predictions.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0; n_classes]; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t < n_classes && p < n_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

/// Precision, recall, F1 and support for one class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus overall accuracy.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub total: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Build a report from true and predicted labels.
    ///
    /// Undefined precision or recall (no predictions or no support) is 0.
    pub fn new(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> Self {
        let matrix = confusion_matrix(y_true, y_pred, class_names.len());
        let classes = class_names
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let tp = matrix[c][c];
                let predicted: usize = matrix.iter().map(|row| row[c]).sum();
                let support: usize = matrix[c].iter().sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    class: name.clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            classes,
            accuracy: accuracy(y_true, y_pred),
            total: y_true.len(),
        }
    }

    /// Unweighted mean of per-class (precision, recall, F1).
    pub fn macro_average(&self) -> (f64, f64, f64) {
        let n = self.classes.len().max(1) as f64;
        let (p, r, f) = self.classes.iter().fold((0.0, 0.0, 0.0), |acc, m| {
            (acc.0 + m.precision, acc.1 + m.recall, acc.2 + m.f1)
        });
        (p / n, r / n, f / n)
    }

    /// Support-weighted mean of per-class (precision, recall, F1).
    pub fn weighted_average(&self) -> (f64, f64, f64) {
        let total: usize = self.classes.iter().map(|m| m.support).sum();
        if total == 0 {
            return (0.0, 0.0, 0.0);
        }
        let (p, r, f) = self.classes.iter().fold((0.0, 0.0, 0.0), |acc, m| {
            let w = m.support as f64;
            (acc.0 + w * m.precision, acc.1 + w * m.recall, acc.2 + w * m.f1)
        });
        let t = total as f64;
        (p / t, r / t, f / t)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|m| m.class.len())
            .max()
            .unwrap_or(0)
            .max("weighted avg".len());

        writeln!(
            f,
            "{:>width$} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.class, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        let (p, r, f1) = self.macro_average();
        writeln!(
            f,
            "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            "macro avg", p, r, f1, self.total
        )?;
        let (p, r, f1) = self.weighted_average();
        write!(
            f,
            "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            "weighted avg", p, r, f1, self.total
        )
    }
}
