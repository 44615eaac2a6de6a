//! Authentication scoring against a user's stored model

use crate::classifier::ModelFamily;
use crate::error::{HuellaError, Result};
use crate::features::{ensure_finite, ensure_length};
use crate::payload::ModelPayload;
use crate::store::ModelStore;
use serde::Serialize;

/// Confidence strictly above this authenticates
pub const AUTH_THRESHOLD: f64 = 0.5;

/// Genuine/impostor verdict for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AuthDecision {
    pub authenticated: bool,
    /// Probability of the genuine class, always in [0, 1]
    pub confidence: f64,
    pub family: ModelFamily,
}

impl AuthDecision {
    /// Apply the strict `confidence > AUTH_THRESHOLD` rule
    pub fn from_confidence(confidence: f64, family: ModelFamily) -> Self {
        Self {
            authenticated: confidence > AUTH_THRESHOLD,
            confidence,
            family,
        }
    }
}

/// Score `features` with the model stored for `username`
///
/// A missing model is `UserNotEnrolled`; a vector of the wrong length or
/// with NaN/infinite entries is rejected before the classifier runs. Any failure to restore or apply
/// the classifier is `PredictionFailed`, never a negative decision.
pub fn score(
    models: &dyn ModelStore,
    username: &str,
    features: &[f64],
) -> Result<AuthDecision> {
    let stored = models
        .get_model(username)?
        .ok_or_else(|| HuellaError::UserNotEnrolled {
            username: username.to_string(),
        })?;
    ensure_length(stored.feature_length, features)?;
    ensure_finite(features)?;

    let payload = ModelPayload::decode_for(&stored.payload, &stored.family_tag)
        .map_err(|e| HuellaError::prediction(e.to_string()))?;
    let probs = payload
        .classifier
        .predict_proba(&[features.to_vec()])
        .map_err(|e| HuellaError::prediction(e.to_string()))?;
    let confidence = probs
        .first()
        .copied()
        .ok_or_else(|| HuellaError::prediction("classifier returned no probability"))?;

    let decision = AuthDecision::from_confidence(confidence, payload.family());
    tracing::info!(
        user = %username,
        family = %decision.family,
        confidence = decision.confidence,
        authenticated = decision.authenticated,
        "authentication decision"
    );
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ClassifierParams, ForestParams};
    use crate::dataset::{Label, TrainingSet};
    use crate::payload::ModelMetadata;
    use crate::store::MemoryStore;

    fn store_with_model() -> MemoryStore {
        let mut set = TrainingSet::new();
        for i in 0..8 {
            let j = i as f64 * 0.01;
            set.push(vec![0.2 + j, 0.2, 0.2], Label::Genuine);
            set.push(vec![0.8 - j, 0.8, 0.8], Label::Impostor);
        }
        let params = ClassifierParams {
            forest: ForestParams {
                n_trees: 15,
                ..ForestParams::default()
            },
            ..ClassifierParams::default()
        };
        let mut model = Classifier::new(ModelFamily::RandomForest, &params, 4);
        model.fit(&set).unwrap();
        let bytes = ModelPayload::new(model, ModelMetadata::new(16, 3, 1.0))
            .encode()
            .unwrap();

        let store = MemoryStore::new();
        store.save_model("alice", &bytes, "rf", 3).unwrap();
        store
    }

    #[test]
    fn test_genuine_vector_authenticates() {
        let store = store_with_model();
        let decision = score(&store, "alice", &[0.22, 0.2, 0.2]).unwrap();
        assert!(decision.authenticated);
        assert!(decision.confidence > 0.5);
        assert_eq!(decision.family, ModelFamily::RandomForest);
    }

    #[test]
    fn test_impostor_vector_is_rejected_with_confidence() {
        let store = store_with_model();
        let decision = score(&store, "alice", &[0.8, 0.8, 0.8]).unwrap();
        assert!(!decision.authenticated);
        assert!((0.0..=0.5).contains(&decision.confidence));
    }

    #[test]
    fn test_unknown_user() {
        let store = store_with_model();
        let err = score(&store, "bob", &[0.1, 0.1, 0.1]).unwrap_err();
        assert!(matches!(err, HuellaError::UserNotEnrolled { ref username } if username == "bob"));
    }

    #[test]
    fn test_wrong_length() {
        let store = store_with_model();
        let err = score(&store, "alice", &[0.1; 10]).unwrap_err();
        assert!(matches!(
            err,
            HuellaError::FeatureLengthMismatch {
                expected: 3,
                got: 10
            }
        ));
    }

    #[test]
    fn test_corrupt_payload_is_prediction_failure() {
        let store = MemoryStore::new();
        store.save_model("alice", b"garbage", "rf", 3).unwrap();
        let err = score(&store, "alice", &[0.1, 0.1, 0.1]).unwrap_err();
        assert!(matches!(err, HuellaError::PredictionFailed { .. }));
    }

    #[test]
    fn test_non_finite_vector_is_rejected_before_scoring() {
        let store = store_with_model();
        let err = score(&store, "alice", &[0.2, f64::NAN, 0.2]).unwrap_err();
        assert!(matches!(err, HuellaError::NonFiniteFeature { position: 1 }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(AUTH_THRESHOLD, 0.5);
        let at = AuthDecision::from_confidence(0.5, ModelFamily::Svm);
        assert!(!at.authenticated);
        assert_eq!(at.confidence, 0.5);
        let above = AuthDecision::from_confidence(0.5000001, ModelFamily::Svm);
        assert!(above.authenticated);
    }
}
