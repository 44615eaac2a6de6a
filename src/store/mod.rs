//! Storage contracts for users, feature samples and models
//!
//! Two narrow interfaces are consumed by the engine:
//!
//! - [`SampleStore`]: users and their append-only feature samples
//! - [`ModelStore`]: exactly one model record per username (upsert)
//!
//! A store that reports `Ok(false)` from a write declined it; the engine
//! turns that into [`StoreError::Rejected`]. Two backends are provided:
//! [`FsStore`] (durable, one directory) and [`MemoryStore`].

pub mod fs;
pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Storage-layer failure, kept apart from the domain errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Store rejected {op}")]
    Rejected { op: &'static str },

    #[error("Store corrupt: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub username: String,
    /// Seconds since the Unix epoch
    pub created_at: u64,
}

/// Username with the number of stored samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub enrollments: usize,
}

/// The single live model of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredModel {
    pub payload: Vec<u8>,
    pub family_tag: String,
    pub feature_length: usize,
}

/// Users and their feature samples
pub trait SampleStore: Send + Sync {
    fn get_user(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    /// Create `username`, returning the existing record if already present
    fn create_user(&self, username: &str) -> StoreResult<UserRecord>;

    fn save_sample(&self, user_id: u64, features: &[f64]) -> StoreResult<bool>;

    fn get_user_samples(&self, user_id: u64) -> StoreResult<Vec<Vec<f64>>>;

    fn get_all_users(&self) -> StoreResult<Vec<UserSummary>>;
}

/// One model record per username
pub trait ModelStore: Send + Sync {
    /// Insert or overwrite the model for `username`
    fn save_model(
        &self,
        username: &str,
        payload: &[u8],
        family_tag: &str,
        feature_length: usize,
    ) -> StoreResult<bool>;

    fn get_model(&self, username: &str) -> StoreResult<Option<StoredModel>>;
}

pub(crate) fn now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
