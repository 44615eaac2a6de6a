//! Random forest over aprender's `RandomForestClassifier`
//!
//! aprender grows each CART tree on a bootstrap resample seeded from
//! `random_state + tree_index`. The genuine probability of a sample is the
//! fraction of trees voting for the genuine class.
//!
//! # References
//!
//! Breiman, L. (2001). Random forests. Machine Learning, 45(1), 5-32.

use super::{check_samples, to_matrix, ClassifierError};
use crate::dataset::{Label, TrainingSet};
use aprender::tree::RandomForestClassifier;
use serde::{Deserialize, Serialize};

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Maximum tree depth (`None` grows until pure)
    pub max_depth: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
        }
    }
}

/// Bagged ensemble of decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    seed: u64,
    inner: Option<RandomForestClassifier>,
    n_features: Option<usize>,
}

impl RandomForest {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            inner: None,
            n_features: None,
        }
    }

    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        if self.inner.is_some() {
            self.params.n_trees
        } else {
            0
        }
    }

    pub fn fit(&mut self, set: &TrainingSet) -> Result<(), ClassifierError> {
        let dim = super::check_training_set(set)?;
        if self.params.n_trees == 0 {
            return Err(ClassifierError::Numerical(
                "forest needs at least one tree".to_string(),
            ));
        }

        let x = to_matrix(&set.samples)?;
        let y: Vec<usize> = set.labels.iter().map(|l| l.class_index()).collect();

        // Per-tree seeds are random_state + i, so keep headroom below u64::MAX
        let mut forest = RandomForestClassifier::new(self.params.n_trees)
            .with_random_state(self.seed >> 1);
        if let Some(depth) = self.params.max_depth {
            forest = forest.with_max_depth(depth);
        }
        forest
            .fit(&x, &y)
            .map_err(|e| ClassifierError::Numerical(e.to_string()))?;

        self.inner = Some(forest);
        self.n_features = Some(dim);
        Ok(())
    }

    pub fn predict_proba(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>, ClassifierError> {
        check_samples(self.n_features, samples)?;
        let forest = self.inner.as_ref().ok_or(ClassifierError::NotFitted)?;
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let votes = forest.predict_proba(&to_matrix(samples)?);
        let genuine = Label::Genuine.class_index();
        if votes.n_cols() <= genuine {
            return Err(ClassifierError::Numerical(format!(
                "forest produced {} class columns",
                votes.n_cols()
            )));
        }
        Ok((0..samples.len())
            .map(|row| f64::from(votes.get(row, genuine)))
            .collect())
    }

    /// Majority vote; a tied vote goes to the impostor class
    pub fn predict(&self, samples: &[Vec<f64>]) -> Result<Vec<Label>, ClassifierError> {
        Ok(self
            .predict_proba(samples)?
            .into_iter()
            .map(|p| if p > 0.5 { Label::Genuine } else { Label::Impostor })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> TrainingSet {
        let mut set = TrainingSet::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.01;
            set.push(vec![0.0 + jitter, 1.0 - jitter], Label::Genuine);
            set.push(vec![1.0 + jitter, 0.0 - jitter], Label::Impostor);
        }
        set
    }

    #[test]
    fn test_fit_builds_requested_tree_count() {
        let mut forest = RandomForest::new(
            ForestParams {
                n_trees: 7,
                ..ForestParams::default()
            },
            1,
        );
        assert_eq!(forest.n_trees(), 0);
        forest.fit(&two_blobs()).unwrap();
        assert_eq!(forest.n_trees(), 7);
        assert_eq!(forest.n_features(), Some(2));
    }

    #[test]
    fn test_separates_blobs() {
        let mut forest = RandomForest::new(ForestParams::default(), 42);
        forest.fit(&two_blobs()).unwrap();

        let probs = forest
            .predict_proba(&[vec![0.05, 0.95], vec![1.05, -0.05]])
            .unwrap();
        assert!(probs[0] > 0.9, "genuine prob {}", probs[0]);
        assert!(probs[1] < 0.1, "impostor prob {}", probs[1]);

        let labels = forest.predict(&[vec![0.05, 0.95]]).unwrap();
        assert_eq!(labels, vec![Label::Genuine]);
    }

    #[test]
    fn test_same_seed_same_votes() {
        let set = two_blobs();
        let mut a = RandomForest::new(ForestParams::default(), 5);
        let mut b = RandomForest::new(ForestParams::default(), 5);
        a.fit(&set).unwrap();
        b.fit(&set).unwrap();

        let points = vec![vec![0.5, 0.5], vec![0.3, 0.6], vec![0.7, 0.2]];
        assert_eq!(
            a.predict_proba(&points).unwrap(),
            b.predict_proba(&points).unwrap()
        );
    }

    #[test]
    fn test_depth_limited_forest_still_separates() {
        let mut forest = RandomForest::new(
            ForestParams {
                n_trees: 5,
                max_depth: Some(1),
            },
            3,
        );
        forest.fit(&two_blobs()).unwrap();
        let probs = forest.predict_proba(&[vec![0.0, 1.0]]).unwrap();
        assert!(probs[0] > 0.5);
    }

    #[test]
    fn test_vote_fractions_are_tree_multiples() {
        let mut forest = RandomForest::new(
            ForestParams {
                n_trees: 4,
                ..ForestParams::default()
            },
            9,
        );
        forest.fit(&two_blobs()).unwrap();
        for p in forest.predict_proba(&[vec![0.5, 0.5]]).unwrap() {
            let scaled = p * 4.0;
            assert!((scaled - scaled.round()).abs() < 1e-6, "vote fraction {}", p);
        }
    }

    #[test]
    fn test_zero_trees_is_an_error() {
        let mut forest = RandomForest::new(
            ForestParams {
                n_trees: 0,
                ..ForestParams::default()
            },
            3,
        );
        assert!(forest.fit(&two_blobs()).is_err());
    }

    #[test]
    fn test_forest_survives_serde() {
        let mut forest = RandomForest::new(ForestParams::default(), 2);
        forest.fit(&two_blobs()).unwrap();
        let bytes = rmp_serde::to_vec_named(&forest).unwrap();
        let back: RandomForest = rmp_serde::from_slice(&bytes).unwrap();
        let sample = vec![vec![0.1, 0.9]];
        assert_eq!(
            forest.predict_proba(&sample).unwrap(),
            back.predict_proba(&sample).unwrap()
        );
    }
}
