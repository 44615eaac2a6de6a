//! Feature standardization backed by aprender's StandardScaler
//!
//! Only the fitted statistics are kept so they can travel inside a
//! persisted model payload; the transform itself is applied in f64.

use super::{to_matrix, ClassifierError};
use aprender::preprocessing::StandardScaler;
use aprender::traits::Transformer;
use serde::{Deserialize, Serialize};

/// Columns whose spread falls below this are centered but not scaled
const MIN_STD: f64 = 1e-9;

/// Fitted per-column mean and standard deviation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Standardizer {
    /// Fit column statistics on row-major samples
    pub fn fit(samples: &[Vec<f64>]) -> Result<Self, ClassifierError> {
        let n_rows = samples.len();
        let n_cols = samples.first().map(Vec::len).unwrap_or(0);
        if n_rows == 0 || n_cols == 0 {
            return Err(ClassifierError::EmptyInput);
        }

        let matrix = to_matrix(samples)?;

        let mut scaler = StandardScaler::new().with_mean(true).with_std(true);
        scaler
            .fit(&matrix)
            .map_err(|e| ClassifierError::Preprocessing(e.to_string()))?;

        let means: Vec<f64> = scaler.mean().to_vec().into_iter().map(f64::from).collect();
        let stds: Vec<f64> = scaler
            .std()
            .to_vec()
            .into_iter()
            .map(|s| {
                let s = f64::from(s);
                if s.is_finite() && s > MIN_STD {
                    s
                } else {
                    1.0
                }
            })
            .collect();

        if means.len() != n_cols || stds.len() != n_cols {
            return Err(ClassifierError::Preprocessing(format!(
                "scaler produced {} means / {} stds for {} columns",
                means.len(),
                stds.len(),
                n_cols
            )));
        }

        Ok(Self { means, stds })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Standardize one sample
    pub fn transform(&self, sample: &[f64]) -> Vec<f64> {
        sample
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect()
    }

    pub fn transform_all(&self, samples: &[Vec<f64>]) -> Vec<Vec<f64>> {
        samples.iter().map(|s| self.transform(s)).collect()
    }
}
