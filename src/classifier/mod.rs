//! Candidate classifier families
//!
//! Three structurally different binary classifiers sit behind one
//! capability: `fit`, `predict` and `predict_proba`. They are dispatched
//! through the [`Classifier`] enum rather than a trait object so a fitted
//! model can be serialized into a payload and restored with its family.
//!
//! | Family | Tag   | Model                                                  |
//! |--------|-------|--------------------------------------------------------|
//! | Forest | `rf`  | aprender `RandomForestClassifier` (bagged CART trees) |
//! | Svm    | `svm` | RBF-kernel SVM (SMO), aprender `PlattScaling` output  |
//! | Mlp    | `mlp` | aprender `nn` ReLU network trained with `Adam`         |

pub mod forest;
pub mod mlp;
pub mod scaler;
pub mod svm;

use crate::dataset::{Label, TrainingSet};
use aprender::primitives::Matrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use forest::{ForestParams, RandomForest};
pub use mlp::{MlpParams, NeuralNet};
pub use svm::{KernelSvm, SvmParams};

/// Errors raised while fitting or applying a single classifier
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Training set is empty")]
    EmptyInput,

    #[error("Training set needs both genuine and impostor samples")]
    SingleClass,

    #[error("Dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Model not fitted")]
    NotFitted,

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),
}

/// Identifier of a candidate classifier family
///
/// Enumeration order is the tie-break order during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[serde(rename = "rf")]
    RandomForest,
    Svm,
    Mlp,
}

impl ModelFamily {
    /// All families in selection order
    pub const ALL: [ModelFamily; 3] = [ModelFamily::RandomForest, ModelFamily::Svm, ModelFamily::Mlp];

    pub fn tag(self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "rf",
            ModelFamily::Svm => "svm",
            ModelFamily::Mlp => "mlp",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rf" => Ok(ModelFamily::RandomForest),
            "svm" => Ok(ModelFamily::Svm),
            "mlp" => Ok(ModelFamily::Mlp),
            other => Err(format!("Unknown model family: {}", other)),
        }
    }
}

/// Hyperparameters for every family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    pub forest: ForestParams,
    pub svm: SvmParams,
    pub mlp: MlpParams,
}

/// A trainable binary classifier of one family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    Forest(RandomForest),
    Svm(KernelSvm),
    Mlp(NeuralNet),
}

impl Classifier {
    /// Unfitted classifier of `family`
    pub fn new(family: ModelFamily, params: &ClassifierParams, seed: u64) -> Self {
        match family {
            ModelFamily::RandomForest => {
                Classifier::Forest(RandomForest::new(params.forest.clone(), seed))
            }
            ModelFamily::Svm => Classifier::Svm(KernelSvm::new(params.svm.clone(), seed)),
            ModelFamily::Mlp => Classifier::Mlp(NeuralNet::new(params.mlp.clone(), seed)),
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            Classifier::Forest(_) => ModelFamily::RandomForest,
            Classifier::Svm(_) => ModelFamily::Svm,
            Classifier::Mlp(_) => ModelFamily::Mlp,
        }
    }

    pub fn fit(&mut self, set: &TrainingSet) -> Result<(), ClassifierError> {
        check_training_set(set)?;
        match self {
            Classifier::Forest(m) => m.fit(set),
            Classifier::Svm(m) => m.fit(set),
            Classifier::Mlp(m) => m.fit(set),
        }
    }

    pub fn predict(&self, samples: &[Vec<f64>]) -> Result<Vec<Label>, ClassifierError> {
        match self {
            Classifier::Forest(m) => m.predict(samples),
            Classifier::Svm(m) => m.predict(samples),
            Classifier::Mlp(m) => m.predict(samples),
        }
    }

    /// Probability mass assigned to the genuine class, one per sample
    pub fn predict_proba(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>, ClassifierError> {
        let probs = match self {
            Classifier::Forest(m) => m.predict_proba(samples)?,
            Classifier::Svm(m) => m.predict_proba(samples)?,
            Classifier::Mlp(m) => m.predict_proba(samples)?,
        };
        if let Some(bad) = probs.iter().find(|p| !p.is_finite()) {
            return Err(ClassifierError::Numerical(format!(
                "non-finite probability {}",
                bad
            )));
        }
        Ok(probs.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
    }

    /// Number of features the fitted model expects
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Classifier::Forest(m) => m.n_features(),
            Classifier::Svm(m) => m.n_features(),
            Classifier::Mlp(m) => m.n_features(),
        }
    }
}

/// Shared preconditions for every family's `fit`
pub(crate) fn check_training_set(set: &TrainingSet) -> Result<usize, ClassifierError> {
    if set.is_empty() || set.dim() == 0 {
        return Err(ClassifierError::EmptyInput);
    }
    if !set.has_both_classes() {
        return Err(ClassifierError::SingleClass);
    }
    let dim = set.dim();
    if let Some(bad) = set.samples.iter().find(|s| s.len() != dim) {
        return Err(ClassifierError::DimensionMismatch {
            expected: dim,
            got: bad.len(),
        });
    }
    Ok(dim)
}

/// Shared preconditions for every family's prediction path
pub(crate) fn check_samples(
    n_features: Option<usize>,
    samples: &[Vec<f64>],
) -> Result<usize, ClassifierError> {
    let expected = n_features.ok_or(ClassifierError::NotFitted)?;
    if let Some(bad) = samples.iter().find(|s| s.len() != expected) {
        return Err(ClassifierError::DimensionMismatch {
            expected,
            got: bad.len(),
        });
    }
    Ok(expected)
}

/// Row-major f32 matrix for the aprender estimators
pub(crate) fn to_matrix(samples: &[Vec<f64>]) -> Result<Matrix<f32>, ClassifierError> {
    let n_cols = samples.first().map(Vec::len).unwrap_or(0);
    let flat: Vec<f32> = samples.iter().flatten().map(|&v| v as f32).collect();
    Matrix::from_vec(samples.len(), n_cols, flat)
        .map_err(|e| ClassifierError::Preprocessing(e.to_string()))
}

/// Logistic function without overflow for large |x|
pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
