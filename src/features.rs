//! Feature vector helpers
//!
//! A feature vector is an ordered list of behavioral measurements
//! (keystroke timing, mouse dynamics, device signals). Its length is fixed
//! per user by the first sample ever recorded.

use crate::error::{HuellaError, Result};
use anyhow::Context;
use std::path::Path;

/// Reject any vector whose length differs from the expected one
///
/// Mismatched vectors are never truncated or padded.
pub fn ensure_length(expected: usize, features: &[f64]) -> Result<()> {
    if features.len() != expected {
        return Err(HuellaError::FeatureLengthMismatch {
            expected,
            got: features.len(),
        });
    }
    Ok(())
}

/// Reject NaN or infinite measurements, naming the first offending position
pub fn ensure_finite(features: &[f64]) -> Result<()> {
    match features.iter().position(|v| !v.is_finite()) {
        Some(position) => Err(HuellaError::NonFiniteFeature { position }),
        None => Ok(()),
    }
}

/// Parse a comma-separated list of numbers (e.g. `0.12,0.5,-1e-3`)
///
/// Whitespace around entries is ignored; an empty string yields an empty
/// vector.
pub fn parse_feature_list(input: &str) -> anyhow::Result<Vec<f64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split(',')
        .enumerate()
        .map(|(i, raw)| {
            let value: f64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid feature at position {}: {:?}", i, raw.trim()))?;
            if !value.is_finite() {
                anyhow::bail!("Feature at position {} is not finite: {}", i, value);
            }
            Ok(value)
        })
        .collect()
}

/// Read a feature vector from a JSON file holding a flat array of numbers
pub fn read_feature_file(path: impl AsRef<Path>) -> anyhow::Result<Vec<f64>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature file {}", path.display()))?;
    let features: Vec<f64> = serde_json::from_str(&content)
        .with_context(|| format!("Feature file {} is not a JSON number array", path.display()))?;
    Ok(features)
}
