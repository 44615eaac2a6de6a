//! Enrollment: one new sample in, one retrained model out
//!
//! ```text
//! Idle → Appending → Augmenting → Training → Persisting → Done
//!   ↑________________________ failure ______________________|
//! ```
//!
//! Nothing is written until training has produced a model. The new sample
//! is validated and combined with the stored history in memory, the
//! classifier is selected, and only then are the user, the sample and the
//! model committed. A failed enrollment therefore leaves the stores as they
//! were, and the previous model (if any) stays active.

use crate::augment::{augment, AugmentConfig};
use crate::classifier::ModelFamily;
use crate::error::{HuellaError, Result};
use crate::features::{ensure_finite, ensure_length};
use crate::payload::{ModelMetadata, ModelPayload};
use crate::selection::{select_best, CandidateOutcome, SelectionConfig};
use crate::store::{ModelStore, SampleStore, StoreError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fmt;

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStage {
    Idle,
    Appending,
    Augmenting,
    Training,
    Persisting,
    Done,
}

impl fmt::Display for EnrollmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrollmentStage::Idle => "idle",
            EnrollmentStage::Appending => "appending",
            EnrollmentStage::Augmenting => "augmenting",
            EnrollmentStage::Training => "training",
            EnrollmentStage::Persisting => "persisting",
            EnrollmentStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of a successful enrollment
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentOutcome {
    pub family: ModelFamily,
    pub f1_score: f64,
    /// Real samples on record for the user, this one included
    pub samples_count: usize,
    pub candidates: Vec<CandidateOutcome>,
}

struct StageTracker<'a> {
    username: &'a str,
    stage: EnrollmentStage,
}

impl<'a> StageTracker<'a> {
    fn new(username: &'a str) -> Self {
        Self {
            username,
            stage: EnrollmentStage::Idle,
        }
    }

    fn advance(&mut self, next: EnrollmentStage) {
        tracing::debug!(user = %self.username, from = %self.stage, to = %next, "enrollment stage");
        self.stage = next;
    }

    fn fail(&mut self, err: HuellaError) -> HuellaError {
        tracing::debug!(
            user = %self.username,
            from = %self.stage,
            error = %err,
            "enrollment failed, back to idle"
        );
        self.stage = EnrollmentStage::Idle;
        err
    }
}

/// Borrowed collaborators for one enrollment
pub struct Enrollment<'a> {
    pub samples: &'a dyn SampleStore,
    pub models: &'a dyn ModelStore,
    pub augment: &'a AugmentConfig,
    pub selection: &'a SelectionConfig,
}

impl Enrollment<'_> {
    pub fn run(&self, username: &str, features: &[f64]) -> Result<EnrollmentOutcome> {
        let mut tracker = StageTracker::new(username);
        self.run_stages(&mut tracker, username, features)
            .map_err(|e| tracker.fail(e))
    }

    fn run_stages(
        &self,
        tracker: &mut StageTracker<'_>,
        username: &str,
        features: &[f64],
    ) -> Result<EnrollmentOutcome> {
        tracker.advance(EnrollmentStage::Appending);
        let user = self.samples.get_user(username)?;
        let mut real = match &user {
            Some(user) => self.samples.get_user_samples(user.id)?,
            None => Vec::new(),
        };

        if let Some(expected) = self.expected_length(username, &real)? {
            ensure_length(expected, features)?;
        } else if features.is_empty() {
            return Err(HuellaError::insufficient(
                "no prior samples and an empty feature vector",
            ));
        }
        ensure_finite(features)?;
        real.push(features.to_vec());

        tracker.advance(EnrollmentStage::Augmenting);
        let mut rng = match self.augment.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let training_set = augment(&real, self.augment, &mut rng)?;

        tracker.advance(EnrollmentStage::Training);
        let selected = select_best(&training_set, self.selection)?;

        tracker.advance(EnrollmentStage::Persisting);
        let metadata = ModelMetadata::new(training_set.len(), features.len(), selected.f1_score)
            .with_hyperparameter("test_fraction", self.selection.test_fraction.to_string())
            .with_hyperparameter("selection_seed", self.selection.seed.to_string())
            .with_hyperparameter("real_samples", real.len().to_string());
        let payload = ModelPayload::new(selected.classifier, metadata)
            .encode()
            .map_err(|e| HuellaError::training(e.to_string()))?;

        let user = match user {
            Some(user) => user,
            None => self.samples.create_user(username)?,
        };
        if !self.samples.save_sample(user.id, features)? {
            return Err(StoreError::Rejected { op: "save_sample" }.into());
        }
        if !self
            .models
            .save_model(username, &payload, selected.family.tag(), features.len())?
        {
            return Err(StoreError::Rejected { op: "save_model" }.into());
        }

        tracker.advance(EnrollmentStage::Done);
        tracing::info!(
            user = %username,
            family = %selected.family,
            f1 = selected.f1_score,
            samples = real.len(),
            "enrolled"
        );

        Ok(EnrollmentOutcome {
            family: selected.family,
            f1_score: selected.f1_score,
            samples_count: real.len(),
            candidates: selected.candidates,
        })
    }

    /// Length fixed by the first stored sample, else by an existing model
    fn expected_length(&self, username: &str, history: &[Vec<f64>]) -> Result<Option<usize>> {
        if let Some(first) = history.first() {
            return Ok(Some(first.len()));
        }
        Ok(self.models.get_model(username)?.map(|m| m.feature_length))
    }
}
