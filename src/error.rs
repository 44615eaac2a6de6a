//! Error taxonomy for enrollment and authentication
//!
//! Every failure the engine can surface has its own variant so callers can
//! tell "resend a corrected vector" apart from "enroll first" or "retry".
//! Storage failures are kept separate from the domain kinds.

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the enrollment and authentication operations
#[derive(Error, Debug)]
pub enum HuellaError {
    #[error("Feature length mismatch: expected {expected}, got {got}")]
    FeatureLengthMismatch { expected: usize, got: usize },

    #[error("Feature at position {position} is not finite")]
    NonFiniteFeature { position: usize },

    #[error("Insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("Model training failed: {reason}")]
    TrainingFailed { reason: String },

    #[error("Model prediction failed: {reason}")]
    PredictionFailed { reason: String },

    #[error("User not enrolled: {username}")]
    UserNotEnrolled { username: String },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, HuellaError>;

impl HuellaError {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        HuellaError::InsufficientData {
            reason: reason.into(),
        }
    }

    pub fn training(reason: impl Into<String>) -> Self {
        HuellaError::TrainingFailed {
            reason: reason.into(),
        }
    }

    pub fn prediction(reason: impl Into<String>) -> Self {
        HuellaError::PredictionFailed {
            reason: reason.into(),
        }
    }

    /// HTTP status an outer routing layer should answer with
    ///
    /// - 400: the caller sent something unusable (length mismatch, NaN or
    ///   infinite values, too little data)
    /// - 404: no user or model to authenticate against
    /// - 500: training, prediction or storage broke
    pub fn status_code(&self) -> u16 {
        match self {
            HuellaError::FeatureLengthMismatch { .. }
            | HuellaError::NonFiniteFeature { .. }
            | HuellaError::InsufficientData { .. } => 400,
            HuellaError::UserNotEnrolled { .. } => 404,
            HuellaError::TrainingFailed { .. }
            | HuellaError::PredictionFailed { .. }
            | HuellaError::Persistence(_) => 500,
        }
    }

    /// Short machine-readable kind, stable across releases
    pub fn kind(&self) -> &'static str {
        match self {
            HuellaError::FeatureLengthMismatch { .. } => "feature_length_mismatch",
            HuellaError::NonFiniteFeature { .. } => "non_finite_feature",
            HuellaError::InsufficientData { .. } => "insufficient_data",
            HuellaError::TrainingFailed { .. } => "training_failed",
            HuellaError::PredictionFailed { .. } => "prediction_failed",
            HuellaError::UserNotEnrolled { .. } => "user_not_enrolled",
            HuellaError::Persistence(_) => "persistence",
        }
    }
}
