//! Kernel-margin classifier: RBF support vector machine
//!
//! Inputs are standardized, then a soft-margin SVM is fitted with the
//! simplified SMO algorithm. aprender only ships a linear SVM, so the
//! kernel solver lives here. Probabilities come from aprender's
//! `PlattScaling` fitted to the training decision values.
//!
//! # References
//!
//! Platt, J. (1998). Sequential minimal optimization: A fast algorithm for
//! training support vector machines. Microsoft Research MSR-TR-98-14.

use super::scaler::Standardizer;
use super::{check_samples, sigmoid, ClassifierError};
use crate::dataset::{Label, TrainingSet};
use aprender::calibration::PlattScaling;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Alphas below this are not support vectors
const ALPHA_EPS: f64 = 1e-8;

/// SVM hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmParams {
    /// Soft-margin penalty
    pub c: f64,
    /// RBF width; `None` uses `1 / (n_features * var(X))`
    pub gamma: Option<f64>,
    /// KKT tolerance
    pub tol: f64,
    /// Consecutive passes without alpha changes before stopping
    pub max_passes: usize,
    /// Hard cap on SMO sweeps
    pub max_iter: usize,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tol: 1e-3,
            max_passes: 10,
            max_iter: 1000,
        }
    }
}

/// Platt parameters: `P(genuine | f) = sigmoid(a*f + b)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct PlattParams {
    a: f64,
    b: f64,
}

impl PlattParams {
    /// Calibrate with aprender's `PlattScaling`; only `(a, b)` is kept
    fn fit(decisions: &[f64], genuine: &[bool]) -> Self {
        let logits: Vec<f32> = decisions.iter().map(|&d| d as f32).collect();
        let mut platt = PlattScaling::new();
        platt.fit(&logits, genuine);
        let (a, b) = platt.params();
        Self {
            a: f64::from(a),
            b: f64::from(b),
        }
    }

    fn probability(&self, decision: f64) -> f64 {
        sigmoid(self.a * decision + self.b)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedSvm {
    scaler: Standardizer,
    gamma: f64,
    /// Standardized support vectors
    support: Vec<Vec<f64>>,
    /// `alpha_i * y_i` per support vector
    dual_coef: Vec<f64>,
    bias: f64,
    platt: PlattParams,
}

impl FittedSvm {
    fn decision(&self, sample: &[f64]) -> f64 {
        let x = self.scaler.transform(sample);
        self.support
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, &coef)| coef * rbf(self.gamma, sv, &x))
            .sum::<f64>()
            + self.bias
    }
}

fn rbf(gamma: f64, a: &[f64], b: &[f64]) -> f64 {
    let dist2: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * dist2).exp()
}

/// RBF-kernel SVM with calibrated probabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelSvm {
    params: SvmParams,
    seed: u64,
    fitted: Option<FittedSvm>,
}

impl KernelSvm {
    pub fn new(params: SvmParams, seed: u64) -> Self {
        Self {
            params,
            seed,
            fitted: None,
        }
    }

    pub fn n_features(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.scaler.n_features())
    }

    pub fn n_support(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.support.len())
    }

    pub fn fit(&mut self, set: &TrainingSet) -> Result<(), ClassifierError> {
        let dim = super::check_training_set(set)?;
        if self.params.c.is_nan() || self.params.c <= 0.0 {
            return Err(ClassifierError::Numerical(format!(
                "C must be positive, got {}",
                self.params.c
            )));
        }

        let scaler = Standardizer::fit(&set.samples)?;
        let x = scaler.transform_all(&set.samples);
        let y: Vec<f64> = set
            .labels
            .iter()
            .map(|l| if l.is_genuine() { 1.0 } else { -1.0 })
            .collect();
        let gamma = self.params.gamma.unwrap_or_else(|| scale_gamma(&x, dim));

        let n = x.len();
        let kernel: Vec<Vec<f64>> = (0..n)
            .map(|i| (0..n).map(|j| rbf(gamma, &x[i], &x[j])).collect())
            .collect();

        let (alphas, bias) = self.smo(&kernel, &y);

        let decisions: Vec<f64> = (0..n)
            .map(|i| {
                (0..n).map(|j| alphas[j] * y[j] * kernel[j][i]).sum::<f64>() + bias
            })
            .collect();
        if decisions.iter().any(|d| !d.is_finite()) {
            return Err(ClassifierError::Numerical(
                "non-finite SVM decision value".to_string(),
            ));
        }
        let genuine: Vec<bool> = set.labels.iter().map(|l| l.is_genuine()).collect();
        let platt = PlattParams::fit(&decisions, &genuine);

        let (support, dual_coef): (Vec<Vec<f64>>, Vec<f64>) = (0..n)
            .filter(|&i| alphas[i] > ALPHA_EPS)
            .map(|i| (x[i].clone(), alphas[i] * y[i]))
            .unzip();
        if support.is_empty() {
            return Err(ClassifierError::Numerical(
                "SMO produced no support vectors".to_string(),
            ));
        }

        self.fitted = Some(FittedSvm {
            scaler,
            gamma,
            support,
            dual_coef,
            bias,
            platt,
        });
        Ok(())
    }

    /// Simplified SMO over a precomputed kernel matrix
    fn smo(&self, kernel: &[Vec<f64>], y: &[f64]) -> (Vec<f64>, f64) {
        let n = y.len();
        let c = self.params.c;
        let tol = self.params.tol;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut alphas = vec![0.0; n];
        let mut b = 0.0;

        let output = |alphas: &[f64], b: f64, i: usize| -> f64 {
            (0..n).map(|j| alphas[j] * y[j] * kernel[j][i]).sum::<f64>() + b
        };

        let mut passes = 0;
        let mut iter = 0;
        while passes < self.params.max_passes && iter < self.params.max_iter {
            iter += 1;
            let mut changed = 0;
            for i in 0..n {
                let e_i = output(&alphas, b, i) - y[i];
                let violates = (y[i] * e_i < -tol && alphas[i] < c)
                    || (y[i] * e_i > tol && alphas[i] > 0.0);
                if !violates {
                    continue;
                }

                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let e_j = output(&alphas, b, j) - y[j];
                let (ai_old, aj_old) = (alphas[i], alphas[j]);

                let (lo, hi) = if y[i] != y[j] {
                    ((aj_old - ai_old).max(0.0), (c + aj_old - ai_old).min(c))
                } else {
                    ((ai_old + aj_old - c).max(0.0), (ai_old + aj_old).min(c))
                };
                if (hi - lo).abs() < 1e-12 {
                    continue;
                }

                let eta = 2.0 * kernel[i][j] - kernel[i][i] - kernel[j][j];
                if eta >= 0.0 {
                    continue;
                }

                let aj = (aj_old - y[j] * (e_i - e_j) / eta).clamp(lo, hi);
                if (aj - aj_old).abs() < 1e-5 {
                    continue;
                }
                let ai = ai_old + y[i] * y[j] * (aj_old - aj);
                alphas[i] = ai;
                alphas[j] = aj;

                let b1 = b
                    - e_i
                    - y[i] * (ai - ai_old) * kernel[i][i]
                    - y[j] * (aj - aj_old) * kernel[i][j];
                let b2 = b
                    - e_j
                    - y[i] * (ai - ai_old) * kernel[i][j]
                    - y[j] * (aj - aj_old) * kernel[j][j];
                b = if ai > 0.0 && ai < c {
                    b1
                } else if aj > 0.0 && aj < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };
                changed += 1;
            }

            if changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        (alphas, b)
    }

    /// Raw signed distance to the margin (positive leans genuine)
    pub fn decision_function(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>, ClassifierError> {
        check_samples(self.n_features(), samples)?;
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotFitted)?;
        Ok(samples.iter().map(|s| fitted.decision(s)).collect())
    }

    pub fn predict_proba(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>, ClassifierError> {
        let fitted = self.fitted.as_ref().ok_or(ClassifierError::NotFitted)?;
        Ok(self
            .decision_function(samples)?
            .into_iter()
            .map(|d| fitted.platt.probability(d))
            .collect())
    }

    /// Labels by the sign of the decision function
    pub fn predict(&self, samples: &[Vec<f64>]) -> Result<Vec<Label>, ClassifierError> {
        Ok(self
            .decision_function(samples)?
            .into_iter()
            .map(|d| if d > 0.0 { Label::Genuine } else { Label::Impostor })
            .collect())
    }
}

/// `1 / (n_features * var(X))` over every entry of the standardized matrix
fn scale_gamma(x: &[Vec<f64>], dim: usize) -> f64 {
    let count = (x.len() * dim) as f64;
    let mean = x.iter().flatten().sum::<f64>() / count;
    let var = x.iter().flatten().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    if var > 0.0 {
        1.0 / (dim as f64 * var)
    } else {
        1.0
    }
}
