//! Synthetic augmentation of genuine samples
//!
//! A user usually supplies very few real samples, while a binary classifier
//! needs both classes and a handful of examples per class. The augmenter
//! expands the real samples into a balanced set:
//!
//! - every real sample, labeled genuine
//! - `min(max_positive_rounds, n_real)` jittered copies of the base sample
//!   (zero-mean Gaussian noise, small std), labeled genuine
//! - `negative_rounds` copies of the base sample pushed away by Gaussian
//!   noise with a materially larger mean, labeled impostor
//!
//! The base sample is the first real sample ever recorded.

use crate::dataset::{Label, TrainingSet};
use crate::error::{HuellaError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Augmentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Upper bound on synthetic genuine rounds (actual count is `min(this, n_real)`)
    pub max_positive_rounds: usize,
    /// Standard deviation of the genuine jitter
    pub positive_std: f64,
    /// Number of synthetic impostor samples
    pub negative_rounds: usize,
    /// Mean offset of the impostor perturbation
    pub negative_mean: f64,
    /// Standard deviation of the impostor perturbation
    pub negative_std: f64,
    /// Fixed seed for reproducible enrollments; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            max_positive_rounds: 20,
            positive_std: 0.03,
            negative_rounds: 3,
            negative_mean: 0.2,
            negative_std: 0.1,
            seed: None,
        }
    }
}

impl AugmentConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.negative_rounds == 0 {
            return Err("negative_rounds must be >= 1 so both classes exist".to_string());
        }
        if !(self.positive_std.is_finite() && self.positive_std >= 0.0) {
            return Err(format!(
                "positive_std must be finite and non-negative, got {}",
                self.positive_std
            ));
        }
        if !(self.negative_std.is_finite() && self.negative_std >= 0.0) {
            return Err(format!(
                "negative_std must be finite and non-negative, got {}",
                self.negative_std
            ));
        }
        if !self.negative_mean.is_finite() {
            return Err(format!(
                "negative_mean must be finite, got {}",
                self.negative_mean
            ));
        }
        Ok(())
    }

    /// Number of synthetic genuine rounds for `n_real` real samples
    pub fn positive_rounds(&self, n_real: usize) -> usize {
        self.max_positive_rounds.min(n_real)
    }
}

/// Draw one sample from N(mean, std^2) (Box-Muller transform)
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    // u1 in (0, 1] keeps ln() finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std * z
}

fn perturb<R: Rng + ?Sized>(rng: &mut R, base: &[f64], mean: f64, std: f64) -> Vec<f64> {
    base.iter().map(|&x| x + gaussian(rng, mean, std)).collect()
}

/// Expand real genuine samples into a class-balanced training set
///
/// Fails with `InsufficientData` when no real sample exists; an entirely
/// synthetic baseline is never fabricated.
pub fn augment<R: Rng + ?Sized>(
    real: &[Vec<f64>],
    config: &AugmentConfig,
    rng: &mut R,
) -> Result<TrainingSet> {
    let base = match real.first() {
        Some(base) if !base.is_empty() => base,
        Some(_) => return Err(HuellaError::insufficient("feature vector is empty")),
        None => return Err(HuellaError::insufficient("no real samples to augment")),
    };

    let mut set = TrainingSet::new();
    for sample in real {
        crate::features::ensure_length(base.len(), sample)?;
        set.push(sample.clone(), Label::Genuine);
    }

    for _ in 0..config.positive_rounds(real.len()) {
        set.push(
            perturb(rng, base, 0.0, config.positive_std),
            Label::Genuine,
        );
    }

    for _ in 0..config.negative_rounds {
        set.push(
            perturb(rng, base, config.negative_mean, config.negative_std),
            Label::Impostor,
        );
    }

    tracing::debug!(
        real = real.len(),
        genuine = set.count(Label::Genuine),
        impostor = set.count(Label::Impostor),
        dim = base.len(),
        "augmented training set"
    );

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn test_default_config_matches_documented_policy() {
        let config = AugmentConfig::default();
        assert_eq!(config.max_positive_rounds, 20);
        assert_eq!(config.positive_std, 0.03);
        assert_eq!(config.negative_rounds, 3);
        assert_eq!(config.negative_mean, 0.2);
        assert_eq!(config.negative_std, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_positive_rounds_capped_by_real_count() {
        let config = AugmentConfig::default();
        assert_eq!(config.positive_rounds(1), 1);
        assert_eq!(config.positive_rounds(7), 7);
        assert_eq!(config.positive_rounds(50), 20);
    }

    #[test]
    fn test_single_sample_shape() {
        let real = vec![vec![0.5; 27]];
        let set = augment(&real, &AugmentConfig::default(), &mut rng()).unwrap();

        // 1 real + 1 jittered genuine, 3 impostors
        assert_eq!(set.count(Label::Genuine), 2);
        assert_eq!(set.count(Label::Impostor), 3);
        assert!(set.samples.iter().all(|s| s.len() == 27));
        assert_eq!(set.samples[0], real[0]);
    }

    #[test]
    fn test_many_samples_shape() {
        let real: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64 * 0.01; 5]).collect();
        let set = augment(&real, &AugmentConfig::default(), &mut rng()).unwrap();
        assert_eq!(set.count(Label::Genuine), 30 + 20);
        assert_eq!(set.count(Label::Impostor), 3);
    }

    #[test]
    fn test_refuses_without_real_samples() {
        let err = augment(&[], &AugmentConfig::default(), &mut rng()).unwrap_err();
        assert!(matches!(err, HuellaError::InsufficientData { .. }));
    }

    #[test]
    fn test_refuses_empty_vector() {
        let err = augment(&[vec![]], &AugmentConfig::default(), &mut rng()).unwrap_err();
        assert!(matches!(err, HuellaError::InsufficientData { .. }));
    }

    #[test]
    fn test_rejects_ragged_history() {
        let real = vec![vec![0.1, 0.2], vec![0.1]];
        let err = augment(&real, &AugmentConfig::default(), &mut rng()).unwrap_err();
        assert!(matches!(
            err,
            HuellaError::FeatureLengthMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_impostors_are_offset_from_base() {
        let real = vec![vec![0.0; 200]];
        let set = augment(&real, &AugmentConfig::default(), &mut rng()).unwrap();

        for (sample, label) in set.samples.iter().zip(&set.labels) {
            let mean = sample.iter().sum::<f64>() / sample.len() as f64;
            match label {
                Label::Genuine => assert!(mean.abs() < 0.02, "genuine mean {}", mean),
                Label::Impostor => assert!((mean - 0.2).abs() < 0.05, "impostor mean {}", mean),
            }
        }
    }

    #[test]
    fn test_gaussian_moments() {
        let mut r = rng();
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| gaussian(&mut r, 0.2, 0.1)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 0.2).abs() < 0.01);
        assert!((var.sqrt() - 0.1).abs() < 0.01);
    }

    #[test]
    fn test_seeded_augmentation_is_reproducible() {
        let real = vec![vec![0.3; 4], vec![0.31; 4]];
        let config = AugmentConfig::default();
        let a = augment(&real, &config, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = augment(&real, &config, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_rejects_zero_negative_rounds() {
        let config = AugmentConfig {
            negative_rounds: 0,
            ..AugmentConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
