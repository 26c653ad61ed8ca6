// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store document and its lock-holding session.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use vd_core::{Client, Config, Event, Task};

pub const SCHEMA_VERSION: &str = "4";

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Root document of the event store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Db {
    pub events: Vec<Event>,
    pub clients: Vec<Client>,
    pub tasks: Vec<Task>,
    pub config: Config,
    pub schema_version: String,
}

impl Default for Db {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            clients: Vec::new(),
            tasks: Vec::new(),
            config: Config::default(),
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

/// Sidecar lock path for a store path: `db.json` → `db.json.lock`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// An open store session holding the cross-process lock.
///
/// `open` blocks until the advisory lock on the sidecar path is acquired,
/// then loads the document (default-initialised when the file is absent).
/// The lock is held until the session drops; `commit` writes atomically
/// (temp file + rename) while still holding it.
pub struct Store {
    db: Db,
    path: PathBuf,
    // Held for the lifetime of the session; unlocked on drop.
    _lock_file: File,
}

impl Store {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Acquire the lock before touching the document. Never truncate the
        // lock file: another process may hold it.
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path_for(&path))?;
        lock_file.lock_exclusive()?;

        let db = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Db::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            Db::default()
        };
        debug!(path = %path.display(), events = db.events.len(), "store opened");

        Ok(Self { db, path, _lock_file: lock_file })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut Db {
        &mut self.db
    }

    pub fn config(&self) -> &Config {
        &self.db.config
    }

    /// Replace the config, bumping its version for reader-side caches.
    pub fn save_config(&mut self, mut config: Config) {
        config.version = self.db.config.version + 1;
        self.db.config = config;
    }

    /// Persist the document atomically while still holding the lock.
    pub fn commit(&self) -> Result<(), StoreError> {
        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        let serialized = serde_json::to_string_pretty(&self.db)?;
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "store committed");
        Ok(())
    }

    /// One-shot read: lock, load, release.
    pub fn read(path: impl Into<PathBuf>) -> Result<Db, StoreError> {
        let store = Self::open(path)?;
        Ok(store.db)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
