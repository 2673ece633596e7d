//! Quota Store
//!
//! Durable storage for the single quota record. Loading never fails: any
//! read or parse problem is logged and treated as "no record yet".

use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::state::QuotaState;
use crate::error::StorageError;

/// Storage backend for the quota record
pub trait QuotaStore: Send + Sync {
    /// Load the persisted state, or a fresh one starting at `now`
    fn load(&self, now: DateTime<Utc>) -> QuotaState;

    /// Overwrite the persisted state
    fn save(&self, state: &QuotaState) -> Result<(), StorageError>;
}

/// JSON file store, written atomically via a sibling temp file
#[derive(Debug, Clone)]
pub struct FileQuotaStore {
    path: PathBuf,
}

impl FileQuotaStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<QuotaState>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl QuotaStore for FileQuotaStore {
    fn load(&self, now: DateTime<Utc>) -> QuotaState {
        match self.read() {
            Ok(Some(state)) => {
                debug!(path = ?self.path, count = state.count, "Loaded quota state");
                state.clamp_to(now)
            }
            Ok(None) => {
                debug!(path = ?self.path, "No quota state on disk, starting fresh");
                QuotaState::fresh(now)
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable quota state, starting fresh");
                QuotaState::fresh(now)
            }
        }
    }

    fn save(&self, state: &QuotaState) -> Result<(), StorageError> {
        let json = serde_json::to_string(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, json).map_err(|source| StorageError::Write {
            path: temp_path.clone(),
            source,
        })?;

        fs::rename(&temp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            StorageError::Write {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(path = ?self.path, count = state.count, "Saved quota state");
        Ok(())
    }
}

/// Process-local store, used for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    state: Mutex<Option<QuotaState>>,
    read_only: bool,
}

impl MemoryQuotaStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `state`
    pub fn with_state(state: QuotaState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            read_only: false,
        }
    }

    /// Create a store whose saves always fail
    pub fn read_only(state: Option<QuotaState>) -> Self {
        Self {
            state: Mutex::new(state),
            read_only: true,
        }
    }

    /// Last saved state, if any
    pub fn snapshot(&self) -> Option<QuotaState> {
        self.state.lock().ok().and_then(|guard| *guard)
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn load(&self, now: DateTime<Utc>) -> QuotaState {
        self.snapshot()
            .map(|state| state.clamp_to(now))
            .unwrap_or_else(|| QuotaState::fresh(now))
    }

    fn save(&self, state: &QuotaState) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        if let Ok(mut guard) = self.state.lock() {
            *guard = Some(*state);
        }
        Ok(())
    }
}
