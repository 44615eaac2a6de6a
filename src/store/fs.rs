//! Durable store rooted at a single directory
//!
//! ```text
//! <root>/
//! ├─ store.lock              advisory lock guarding the index and samples
//! ├─ users.json              user index, ids assigned sequentially
//! ├─ samples/<id>.jsonl      one feature sample per line, append-only
//! └─ models/<hex(name)>.json one model record per user, payload hex-encoded
//! ```
//!
//! The user index and model records are replaced atomically (write to a
//! uniquely named temporary sibling, then rename), so a reader sees either
//! the old or the new record and never a torn one.
//!
//! Several processes may open the same root. Index and sample access takes
//! an OS file lock on `store.lock` (exclusive to write, shared to read), so
//! user ids stay unique across processes as well as threads.

use super::{
    now_secs, ModelStore, SampleStore, StoreError, StoreResult, StoredModel, UserRecord,
    UserSummary,
};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const LOCK_FILE: &str = "store.lock";

/// Per-process counter making temporary file names unique
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserIndex {
    next_id: u64,
    users: Vec<UserRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SampleLine {
    features: Vec<f64>,
    submitted_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelRecord {
    username: String,
    family_tag: String,
    feature_length: usize,
    saved_at: u64,
    payload: String,
}

/// Held OS lock on `store.lock`; released when dropped
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(error = %e, "failed to release store lock");
        }
    }
}

/// Filesystem-backed implementation of both store contracts
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open (creating if needed) a store under `root`
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("samples"))?;
        fs::create_dir_all(root.join("models"))?;
        tracing::debug!(root = %root.display(), "opened store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Block until this handle holds the store lock
    ///
    /// Each call opens its own descriptor, so the lock also excludes other
    /// threads of this process.
    fn lock(&self, exclusive: bool) -> StoreResult<LockGuard> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILE))?;
        if exclusive {
            file.lock()?;
        } else {
            file.lock_shared()?;
        }
        Ok(LockGuard { file })
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("users.json")
    }

    fn samples_path(&self, user_id: u64) -> PathBuf {
        self.root.join("samples").join(format!("{}.jsonl", user_id))
    }

    fn model_path(&self, username: &str) -> PathBuf {
        self.root
            .join("models")
            .join(format!("{}.json", hex::encode(username.as_bytes())))
    }

    fn load_index(&self) -> StoreResult<UserIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(UserIndex {
                next_id: 1,
                users: Vec::new(),
            });
        }
        let text = fs::read_to_string(&path)?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    /// Parse a sample file; the caller holds the store lock
    fn read_samples(&self, user_id: u64) -> StoreResult<Vec<Vec<f64>>> {
        let path = self.samples_path(user_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut samples = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: SampleLine = serde_json::from_str(&line).map_err(|e| {
                StoreError::Corrupt(format!("{}:{}: {}", path.display(), lineno + 1, e))
            })?;
            samples.push(parsed.features);
        }
        Ok(samples)
    }
}

/// Temporary sibling of `path` no other writer will pick
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
}

/// Replace `path` with `bytes` via a temporary sibling and rename
fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = temp_path(path);
    let written = File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| StoreError::Codec(e.to_string()))
}

impl SampleStore for FsStore {
    fn get_user(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let _guard = self.lock(false)?;
        Ok(self
            .load_index()?
            .users
            .into_iter()
            .find(|u| u.username == username))
    }

    fn create_user(&self, username: &str) -> StoreResult<UserRecord> {
        let _guard = self.lock(true)?;
        let mut index = self.load_index()?;
        if let Some(existing) = index.users.iter().find(|u| u.username == username) {
            return Ok(existing.clone());
        }

        let record = UserRecord {
            id: index.next_id,
            username: username.to_string(),
            created_at: now_secs(),
        };
        index.next_id += 1;
        index.users.push(record.clone());
        write_atomic(&self.index_path(), &to_json(&index)?)?;

        tracing::debug!(user = %username, id = record.id, "created user");
        Ok(record)
    }

    fn save_sample(&self, user_id: u64, features: &[f64]) -> StoreResult<bool> {
        let _guard = self.lock(true)?;
        if !self.load_index()?.users.iter().any(|u| u.id == user_id) {
            return Ok(false);
        }

        let mut line = serde_json::to_string(&SampleLine {
            features: features.to_vec(),
            submitted_at: now_secs(),
        })
        .map_err(|e| StoreError::Codec(e.to_string()))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.samples_path(user_id))?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        Ok(true)
    }

    fn get_user_samples(&self, user_id: u64) -> StoreResult<Vec<Vec<f64>>> {
        let _guard = self.lock(false)?;
        self.read_samples(user_id)
    }

    fn get_all_users(&self) -> StoreResult<Vec<UserSummary>> {
        let _guard = self.lock(false)?;
        self.load_index()?
            .users
            .into_iter()
            .map(|u| {
                Ok(UserSummary {
                    enrollments: self.read_samples(u.id)?.len(),
                    username: u.username,
                })
            })
            .collect()
    }
}

impl ModelStore for FsStore {
    fn save_model(
        &self,
        username: &str,
        payload: &[u8],
        family_tag: &str,
        feature_length: usize,
    ) -> StoreResult<bool> {
        let record = ModelRecord {
            username: username.to_string(),
            family_tag: family_tag.to_string(),
            feature_length,
            saved_at: now_secs(),
            payload: hex::encode(payload),
        };
        write_atomic(&self.model_path(username), &to_json(&record)?)?;
        tracing::debug!(user = %username, family = %family_tag, bytes = payload.len(), "saved model");
        Ok(true)
    }

    fn get_model(&self, username: &str) -> StoreResult<Option<StoredModel>> {
        let path = self.model_path(username);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let record: ModelRecord = serde_json::from_str(&text)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;
        let payload = hex::decode(&record.payload)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;

        Ok(Some(StoredModel {
            payload,
            family_tag: record.family_tag,
            feature_length: record.feature_length,
        }))
    }
}
