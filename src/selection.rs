//! Train-and-select across the candidate classifier families
//!
//! The training set is split once (stratified, seeded) into a train and a
//! held-out portion. Every family is fitted on the train portion and scored
//! by F1 over the genuine class on the held-out portion. The family with
//! the strictly highest score wins, so on a tie the earlier family in
//! [`ModelFamily::ALL`] is kept (see [`first_best`]).
//!
//! A family that fails to fit or predict is logged and skipped. Selection
//! fails only when no family produced a score.

use crate::classifier::{Classifier, ClassifierParams, ModelFamily};
use crate::dataset::TrainingSet;
use crate::error::{HuellaError, Result};
use crate::metrics::{f1_score, macro_f1_score};
use serde::{Deserialize, Serialize};

/// Selection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Fraction of each class withheld for scoring
    pub test_fraction: f64,
    /// Seed for the split; family seeds are derived from it
    pub seed: u64,
    #[serde(flatten)]
    pub params: ClassifierParams,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.3,
            seed: 42,
            params: ClassifierParams::default(),
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            ));
        }
        Ok(())
    }
}

/// How one family fared on the held-out portion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOutcome {
    pub family: ModelFamily,
    /// Held-out F1, absent when the family failed
    pub f1_score: Option<f64>,
    pub error: Option<String>,
}

impl CandidateOutcome {
    pub fn succeeded(&self) -> bool {
        self.f1_score.is_some()
    }
}

/// Winning classifier plus the full candidate report
#[derive(Debug, Clone)]
pub struct SelectedModel {
    pub classifier: Classifier,
    pub family: ModelFamily,
    pub f1_score: f64,
    pub candidates: Vec<CandidateOutcome>,
}

/// Fit one family on `train` and score it on `held_out`
fn evaluate(
    family: ModelFamily,
    config: &SelectionConfig,
    seed: u64,
    train: &TrainingSet,
    held_out: &TrainingSet,
) -> std::result::Result<(Classifier, f64), String> {
    let mut classifier = Classifier::new(family, &config.params, seed);
    classifier.fit(train).map_err(|e| format!("fit: {}", e))?;
    let predicted = classifier
        .predict(&held_out.samples)
        .map_err(|e| format!("predict: {}", e))?;
    tracing::debug!(
        family = %family,
        macro_f1 = macro_f1_score(&held_out.labels, &predicted),
        "held-out macro F1"
    );
    Ok((classifier, f1_score(&held_out.labels, &predicted)))
}

/// Position and value of the highest score, skipping absent ones
///
/// Only a strictly higher score displaces the current best, so among equal
/// scores the earliest position wins.
pub fn first_best<I>(scores: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.into_iter().enumerate() {
        let Some(score) = score else { continue };
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    best
}

/// Fit every family and keep the best by held-out F1
pub fn select_best(set: &TrainingSet, config: &SelectionConfig) -> Result<SelectedModel> {
    if !set.has_both_classes() {
        return Err(HuellaError::training(
            "training set must contain genuine and impostor samples",
        ));
    }

    let (train, held_out) = set
        .stratified_split(config.test_fraction, config.seed)
        .map_err(|e| HuellaError::training(format!("split: {}", e)))?;
    tracing::debug!(
        train = train.len(),
        held_out = held_out.len(),
        "split training set"
    );

    let mut fitted: Vec<Option<Classifier>> = Vec::with_capacity(ModelFamily::ALL.len());
    let mut candidates = Vec::with_capacity(ModelFamily::ALL.len());

    for (i, family) in ModelFamily::ALL.into_iter().enumerate() {
        let seed = config.seed.wrapping_add(i as u64);
        match evaluate(family, config, seed, &train, &held_out) {
            Ok((classifier, score)) => {
                tracing::debug!(family = %family, f1 = score, "candidate scored");
                candidates.push(CandidateOutcome {
                    family,
                    f1_score: Some(score),
                    error: None,
                });
                fitted.push(Some(classifier));
            }
            Err(reason) => {
                tracing::warn!(family = %family, %reason, "candidate failed, skipping");
                candidates.push(CandidateOutcome {
                    family,
                    f1_score: None,
                    error: Some(reason),
                });
                fitted.push(None);
            }
        }
    }

    let winner = first_best(candidates.iter().map(|c| c.f1_score));
    let Some((classifier, f1_score)) = winner.and_then(|(i, score)| {
        fitted.swap_remove(i).map(|classifier| (classifier, score))
    }) else {
        let reasons: Vec<String> = candidates
            .iter()
            .filter_map(|c| c.error.as_ref().map(|e| format!("{}: {}", c.family, e)))
            .collect();
        return Err(HuellaError::training(format!(
            "every model family failed ({})",
            reasons.join("; ")
        )));
    };

    let family = classifier.family();
    tracing::info!(family = %family, f1 = f1_score, "selected model");

    Ok(SelectedModel {
        classifier,
        family,
        f1_score,
        candidates,
    })
}
