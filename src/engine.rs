//! The engine: injected stores plus configuration
//!
//! [`Huella`] is constructed once at process start and shared by every
//! request. Enrollments for the same username are serialized by a
//! per-user lock so two concurrent enrollments cannot race on the single
//! model record; enrollments for different usernames never contend.
//! A user's lock entry is dropped once no enrollment holds or awaits it.
//! Authentication takes no lock.

use crate::config::HuellaConfig;
use crate::enrollment::{Enrollment, EnrollmentOutcome};
use crate::error::Result;
use crate::scorer::{self, AuthDecision};
use crate::store::{FsStore, MemoryStore, ModelStore, SampleStore, StoreError, UserSummary};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Per-username enrollment locks
#[derive(Default)]
struct UserLocks {
    map: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    fn acquire(&self, username: &str) -> Arc<Mutex<()>> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Hand back a lock from `acquire`, evicting the entry if it is now unused
    ///
    /// Clones happen only under the map lock, so a strong count of 1 seen
    /// here means no other caller holds or awaits this user's lock.
    fn release(&self, username: &str, lock: Arc<Mutex<()>>) {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        drop(lock);
        if map
            .get(username)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            map.remove(username);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Behavioral authentication engine
pub struct Huella {
    samples: Arc<dyn SampleStore>,
    models: Arc<dyn ModelStore>,
    config: HuellaConfig,
    user_locks: UserLocks,
}

impl Huella {
    pub fn new(
        samples: Arc<dyn SampleStore>,
        models: Arc<dyn ModelStore>,
        config: HuellaConfig,
    ) -> Self {
        Self {
            samples,
            models,
            config,
            user_locks: UserLocks::default(),
        }
    }

    /// Engine over a filesystem store at `config.data_dir`
    pub fn open(config: HuellaConfig) -> std::result::Result<Self, StoreError> {
        let store = Arc::new(FsStore::open(&config.data_dir)?);
        Ok(Self::new(store.clone(), store, config))
    }

    /// Engine over a fresh in-memory store
    pub fn in_memory(config: HuellaConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, config)
    }

    pub fn config(&self) -> &HuellaConfig {
        &self.config
    }

    /// Record a sample for `username` and retrain their model
    pub fn enroll(&self, username: &str, features: &[f64]) -> Result<EnrollmentOutcome> {
        let lock = self.user_locks.acquire(username);
        let outcome = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            Enrollment {
                samples: self.samples.as_ref(),
                models: self.models.as_ref(),
                augment: &self.config.augment,
                selection: &self.config.selection,
            }
            .run(username, features)
        };
        self.user_locks.release(username, lock);
        outcome
    }

    /// Score `features` against the stored model of `username`
    pub fn authenticate(&self, username: &str, features: &[f64]) -> Result<AuthDecision> {
        scorer::score(self.models.as_ref(), username, features)
    }

    pub fn list_users(&self) -> Result<Vec<UserSummary>> {
        Ok(self.samples.get_all_users()?)
    }

    /// Feature vector length a client should send for `username`
    ///
    /// The stored model's length wins, then the first recorded sample's
    /// length, then the configured fallback.
    pub fn expected_feature_count(&self, username: Option<&str>) -> Result<usize> {
        let fallback = self.config.scoring.fallback_feature_count;
        let Some(username) = username.filter(|u| !u.is_empty()) else {
            return Ok(fallback);
        };

        if let Some(model) = self.models.get_model(username)? {
            return Ok(model.feature_length);
        }
        if let Some(user) = self.samples.get_user(username)? {
            if let Some(first) = self.samples.get_user_samples(user.id)?.first() {
                return Ok(first.len());
            }
        }
        Ok(fallback)
    }
}
