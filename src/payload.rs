//! Versioned model payload
//!
//! The model store treats the payload as opaque bytes. Inside, a fitted
//! [`Classifier`] travels in a MessagePack envelope together with metadata
//! describing when and how it was trained. Decoding checks the envelope
//! format version before touching the classifier.
//!
//! # References
//!
//! Sculley, D., et al. (2015). Hidden technical debt in machine learning systems.
//! Advances in Neural Information Processing Systems.

use crate::classifier::{Classifier, ModelFamily};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Envelope layout version; bump when the serialized shape changes
pub const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Failed to encode model payload: {0}")]
    Encode(String),

    #[error("Failed to decode model payload: {0}")]
    Decode(String),

    #[error("Model payload version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Model payload family {payload} does not match stored tag {stored}")]
    FamilyMismatch { payload: String, stored: String },
}

/// Training provenance stored alongside the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub format_version: u32,
    /// Crate version that trained the model
    pub huella_version: String,
    /// Seconds since the Unix epoch
    pub trained_at: String,
    /// Size of the augmented training set
    pub training_samples: usize,
    pub feature_length: usize,
    pub f1_score: f64,
    pub hyperparameters: BTreeMap<String, String>,
}

impl ModelMetadata {
    pub fn new(training_samples: usize, feature_length: usize, f1_score: f64) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            huella_version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: crate::store::now_secs().to_string(),
            training_samples,
            feature_length,
            f1_score,
            hyperparameters: BTreeMap::new(),
        }
    }

    pub fn with_hyperparameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hyperparameters.insert(key.into(), value.into());
        self
    }
}

/// Fitted classifier plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPayload {
    pub metadata: ModelMetadata,
    pub classifier: Classifier,
}

impl ModelPayload {
    pub fn new(classifier: Classifier, metadata: ModelMetadata) -> Self {
        Self {
            metadata,
            classifier,
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.classifier.family()
    }

    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        rmp_serde::to_vec_named(self).map_err(|e| PayloadError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        #[derive(Deserialize)]
        struct VersionHeader {
            metadata: MetadataProbe,
        }
        #[derive(Deserialize)]
        struct MetadataProbe {
            format_version: u32,
        }

        let header: VersionHeader =
            rmp_serde::from_slice(bytes).map_err(|e| PayloadError::Decode(e.to_string()))?;
        if header.metadata.format_version != FORMAT_VERSION {
            return Err(PayloadError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: header.metadata.format_version,
            });
        }

        rmp_serde::from_slice(bytes).map_err(|e| PayloadError::Decode(e.to_string()))
    }

    /// Decode and confirm the payload agrees with the stored family tag
    pub fn decode_for(bytes: &[u8], family_tag: &str) -> Result<Self, PayloadError> {
        let payload = Self::decode(bytes)?;
        if payload.family().tag() != family_tag {
            return Err(PayloadError::FamilyMismatch {
                payload: payload.family().tag().to_string(),
                stored: family_tag.to_string(),
            });
        }
        Ok(payload)
    }
}
