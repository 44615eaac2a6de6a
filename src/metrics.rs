//! Binary classification metrics over the genuine (positive) class
//!
//! Counts come from aprender's `confusion_matrix`. aprender's `f1_score`
//! only averages across classes, so the genuine-class F1 used for model
//! selection is derived from the confusion counts; the macro average is
//! reported alongside it for diagnostics.

use crate::dataset::Label;
use aprender::metrics::classification::{confusion_matrix, f1_score as averaged_f1, Average};

/// Confusion counts with genuine as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confusion {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

fn class_indices(labels: &[Label]) -> Vec<usize> {
    labels.iter().map(|l| l.class_index()).collect()
}

impl Confusion {
    /// Tally predictions against the true labels (pairs beyond the shorter slice are ignored)
    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Self {
        let n = actual.len().min(predicted.len());
        if n == 0 {
            return Confusion::default();
        }

        let matrix = confusion_matrix(&class_indices(&predicted[..n]), &class_indices(&actual[..n]));
        // Indexed [true][predicted]; a class absent from both sides has no row
        let cell = |truth: Label, pred: Label| -> usize {
            let (t, p) = (truth.class_index(), pred.class_index());
            if t < matrix.n_rows() && p < matrix.n_cols() {
                matrix.get(t, p)
            } else {
                0
            }
        };

        Confusion {
            true_positive: cell(Label::Genuine, Label::Genuine),
            false_positive: cell(Label::Impostor, Label::Genuine),
            true_negative: cell(Label::Impostor, Label::Impostor),
            false_negative: cell(Label::Genuine, Label::Impostor),
        }
    }

    /// Precision; 0.0 when nothing was predicted genuine
    pub fn precision(&self) -> f64 {
        let denom = self.true_positive + self.false_positive;
        if denom == 0 {
            0.0
        } else {
            self.true_positive as f64 / denom as f64
        }
    }

    /// Recall; 0.0 when no genuine sample exists
    pub fn recall(&self) -> f64 {
        let denom = self.true_positive + self.false_negative;
        if denom == 0 {
            0.0
        } else {
            self.true_positive as f64 / denom as f64
        }
    }

    /// Harmonic mean of precision and recall; 0.0 when both are 0
    pub fn f1(&self) -> f64 {
        let denom = 2 * self.true_positive + self.false_positive + self.false_negative;
        if denom == 0 {
            0.0
        } else {
            2.0 * self.true_positive as f64 / denom as f64
        }
    }

    pub fn accuracy(&self) -> f64 {
        let total =
            self.true_positive + self.false_positive + self.true_negative + self.false_negative;
        if total == 0 {
            0.0
        } else {
            (self.true_positive + self.true_negative) as f64 / total as f64
        }
    }
}

/// F1 score of `predicted` against `actual`
pub fn f1_score(actual: &[Label], predicted: &[Label]) -> f64 {
    Confusion::from_labels(actual, predicted).f1()
}

/// Unweighted mean of the per-class F1 scores; 0.0 for empty input
pub fn macro_f1_score(actual: &[Label], predicted: &[Label]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }
    f64::from(averaged_f1(
        &class_indices(&predicted[..n]),
        &class_indices(&actual[..n]),
        Average::Macro,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label::{Genuine as G, Impostor as I};

    #[test]
    fn test_perfect_prediction() {
        let actual = [G, G, I];
        assert_eq!(f1_score(&actual, &actual), 1.0);
        assert!((macro_f1_score(&actual, &actual) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_known_confusion() {
        // tp=2 fp=1 fn=1 tn=1
        let actual = [G, G, G, I, I];
        let predicted = [G, G, I, G, I];
        let c = Confusion::from_labels(&actual, &predicted);
        assert_eq!(c.true_positive, 2);
        assert_eq!(c.false_positive, 1);
        assert_eq!(c.false_negative, 1);
        assert_eq!(c.true_negative, 1);
        assert!((c.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((c.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((c.f1() - 2.0 / 3.0).abs() < 1e-12);
        assert!((c.accuracy() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_macro_average_differs_from_genuine_f1() {
        // genuine F1 = 2/3, impostor F1 = 1/2
        let actual = [G, G, G, I, I];
        let predicted = [G, G, I, G, I];
        assert!((macro_f1_score(&actual, &predicted) - (2.0 / 3.0 + 0.5) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_positive_predictions_scores_zero() {
        let actual = [G, I];
        let predicted = [I, I];
        assert_eq!(f1_score(&actual, &predicted), 0.0);
    }

    #[test]
    fn test_no_genuine_anywhere_scores_zero() {
        let actual = [I, I];
        let c = Confusion::from_labels(&actual, &actual);
        assert_eq!(c.true_negative, 2);
        assert_eq!(f1_score(&actual, &actual), 0.0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(f1_score(&[], &[]), 0.0);
        assert_eq!(macro_f1_score(&[], &[]), 0.0);
        assert_eq!(Confusion::default().accuracy(), 0.0);
    }
}
