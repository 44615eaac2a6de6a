// Engine configuration
//
// Layering: built-in defaults, then an optional TOML file, then the
// HUELLA_DATA_DIR environment variable. validate() runs last.

use crate::augment::AugmentConfig;
use crate::selection::SelectionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding `data_dir`
pub const DATA_DIR_ENV: &str = "HUELLA_DATA_DIR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Scoring parameters
///
/// The decision threshold is fixed at [`AUTH_THRESHOLD`](crate::scorer::AUTH_THRESHOLD)
/// and cannot be configured; a `threshold` key is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Reported when neither a model nor a sample fixes the length
    pub fallback_feature_count: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fallback_feature_count: 27,
        }
    }
}

/// Top-level configuration
///
/// # Example
/// ```
/// use huella::config::HuellaConfig;
///
/// let config = HuellaConfig::default();
/// assert_eq!(config.scoring.fallback_feature_count, 27);
/// assert_eq!(config.selection.test_fraction, 0.3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuellaConfig {
    /// Root directory of the filesystem store
    pub data_dir: PathBuf,
    pub augment: AugmentConfig,
    pub selection: SelectionConfig,
    pub scoring: ScoringConfig,
}

impl Default for HuellaConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("huella-data"),
            augment: AugmentConfig::default(),
            selection: SelectionConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl HuellaConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, optionally overlaid by a TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text, path)?
            }
            None => Self::default(),
        };

        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }

        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Fully deterministic enrollments (seeded augmentation)
    pub fn reproducible(seed: u64) -> Self {
        let mut config = Self::default();
        config.augment.seed = Some(seed);
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        self.augment.validate()?;
        self.selection.validate()?;

        if self.scoring.fallback_feature_count == 0 {
            return Err("scoring.fallback_feature_count must be positive".to_string());
        }
        Ok(())
    }
}
