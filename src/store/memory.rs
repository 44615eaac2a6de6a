//! In-process store backend

use super::{now_secs, ModelStore, SampleStore, StoreResult, StoredModel, UserRecord, UserSummary};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct State {
    users: Vec<UserRecord>,
    samples: HashMap<u64, Vec<Vec<f64>>>,
    models: HashMap<String, StoredModel>,
}

/// Volatile store for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl SampleStore for MemoryStore {
    fn get_user(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    fn create_user(&self, username: &str) -> StoreResult<UserRecord> {
        let mut state = self.write();
        if let Some(existing) = state.users.iter().find(|u| u.username == username) {
            return Ok(existing.clone());
        }
        let record = UserRecord {
            id: state.users.len() as u64 + 1,
            username: username.to_string(),
            created_at: now_secs(),
        };
        state.users.push(record.clone());
        Ok(record)
    }

    fn save_sample(&self, user_id: u64, features: &[f64]) -> StoreResult<bool> {
        let mut state = self.write();
        if !state.users.iter().any(|u| u.id == user_id) {
            return Ok(false);
        }
        state
            .samples
            .entry(user_id)
            .or_default()
            .push(features.to_vec());
        Ok(true)
    }

    fn get_user_samples(&self, user_id: u64) -> StoreResult<Vec<Vec<f64>>> {
        Ok(self
            .read()
            .samples
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_all_users(&self) -> StoreResult<Vec<UserSummary>> {
        let state = self.read();
        Ok(state
            .users
            .iter()
            .map(|u| UserSummary {
                username: u.username.clone(),
                enrollments: state.samples.get(&u.id).map_or(0, Vec::len),
            })
            .collect())
    }
}

impl ModelStore for MemoryStore {
    fn save_model(
        &self,
        username: &str,
        payload: &[u8],
        family_tag: &str,
        feature_length: usize,
    ) -> StoreResult<bool> {
        self.write().models.insert(
            username.to_string(),
            StoredModel {
                payload: payload.to_vec(),
                family_tag: family_tag.to_string(),
                feature_length,
            },
        );
        Ok(true)
    }

    fn get_model(&self, username: &str) -> StoreResult<Option<StoredModel>> {
        Ok(self.read().models.get(username).cloned())
    }
}
