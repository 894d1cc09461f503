//! Small persistent key-value store standing in for browser local storage.
//! Only the bearer token and the reminder list live here.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::models::TmdbId;

pub const TOKEN_KEY: &str = "token";
pub const REMINDERS_KEY: &str = "reminders";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt state file: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// JSON object on disk; every mutation is written through immediately.
/// Memory only changes once the write has succeeded.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => serde_json::from_str(&text)?,
            Ok(_) => Map::new(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        debug!("Opened state file {}", path.display());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn flush(&self, values: &Map<String, Value>) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, text).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn values(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values()
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values();
        let mut next = values.clone();
        next.insert(key.to_string(), Value::String(value.to_string()));
        self.flush(&next)?;
        *values = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values();
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut next = values.clone();
        next.remove(key);
        self.flush(&next)?;
        *values = next;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values().remove(key);
        Ok(())
    }
}

/// Reminder ids are stored as a JSON array string; a corrupt value reads as empty.
pub fn load_reminders(store: &dyn KeyValueStore) -> Vec<TmdbId> {
    store
        .get(REMINDERS_KEY)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

pub fn save_reminders(store: &dyn KeyValueStore, ids: &[TmdbId]) -> Result<(), StoreError> {
    let raw = serde_json::to_string(ids)?;
    store.set(REMINDERS_KEY, &raw)
}
