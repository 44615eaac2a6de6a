//! Labeled training data and the seeded held-out split

use aprender::model_selection::train_test_split;
use aprender::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Classification label: the enrolled user or somebody else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Genuine,
    Impostor,
}

impl Label {
    pub fn is_genuine(self) -> bool {
        self == Label::Genuine
    }

    /// Class index used by the aprender estimators (genuine = 1)
    pub fn class_index(self) -> usize {
        match self {
            Label::Genuine => 1,
            Label::Impostor => 0,
        }
    }
}

/// Ephemeral labeled set built for one enrollment call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub samples: Vec<Vec<f64>>,
    pub labels: Vec<Label>,
}

impl TrainingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Vec<f64>, label: Label) {
        self.samples.push(sample);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Dimensionality of the samples (0 for an empty set)
    pub fn dim(&self) -> usize {
        self.samples.first().map(Vec::len).unwrap_or(0)
    }

    pub fn count(&self, label: Label) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    pub fn has_both_classes(&self) -> bool {
        self.count(Label::Genuine) > 0 && self.count(Label::Impostor) > 0
    }

    fn subset(&self, indices: &[usize]) -> TrainingSet {
        TrainingSet {
            samples: indices.iter().map(|&i| self.samples[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Split into (train, held_out) with a fixed seed
    ///
    /// The split is stratified: each class sends `round(n_c * fraction)`
    /// samples to the held-out side, capped so that at least one sample of
    /// every class stays in the train side. Each class is shuffled and cut
    /// by aprender's `train_test_split` over its row indices.
    pub fn stratified_split(
        &self,
        fraction: f64,
        seed: u64,
    ) -> Result<(TrainingSet, TrainingSet), String> {
        let mut train_idx = Vec::new();
        let mut held_idx = Vec::new();

        for (offset, label) in [Label::Genuine, Label::Impostor].into_iter().enumerate() {
            let indices: Vec<usize> = self
                .labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == label)
                .map(|(i, _)| i)
                .collect();
            if indices.is_empty() {
                continue;
            }

            let wanted = (indices.len() as f64 * fraction).round() as usize;
            let n_held = wanted.min(indices.len() - 1);
            if n_held == 0 {
                train_idx.extend_from_slice(&indices);
                continue;
            }

            let (train, held) = split_indices(&indices, n_held, seed.wrapping_add(offset as u64))?;
            train_idx.extend(train);
            held_idx.extend(held);
        }

        train_idx.sort_unstable();
        held_idx.sort_unstable();
        Ok((self.subset(&train_idx), self.subset(&held_idx)))
    }
}

/// Shuffle `indices` and send exactly `n_held` of them to the second half
fn split_indices(
    indices: &[usize],
    n_held: usize,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), String> {
    let column: Vec<f32> = indices.iter().map(|&i| i as f32).collect();
    let x = Matrix::from_vec(indices.len(), 1, column).map_err(|e| e.to_string())?;
    let y = Vector::zeros(indices.len());
    let test_size = n_held as f32 / indices.len() as f32;

    let (x_train, x_test, _, _) = train_test_split(&x, &y, test_size, Some(seed))?;
    let rows = |m: &Matrix<f32>| -> Vec<usize> {
        (0..m.n_rows()).map(|r| m.get(r, 0) as usize).collect()
    };
    Ok((rows(&x_train), rows(&x_test)))
}
