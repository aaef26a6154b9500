//! Durable local key-value storage.
//!
//! One pretty-printed JSON file per key, written on every `set`. Holds the
//! small client-side records that must survive restarts (current principal,
//! appearance settings).

use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error for key {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, LocalStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(LocalStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    /// Read and decode a value. A missing key is `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LocalStoreError> {
        let path = self.key_path(key)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LocalStoreError::Io { path, source }),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| LocalStoreError::Json {
                key: key.to_string(),
                source,
            })
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LocalStoreError> {
        let path = self.key_path(key)?;
        fs::create_dir_all(&self.root).map_err(|source| LocalStoreError::Io {
            path: self.root.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(value).map_err(|source| LocalStoreError::Json {
            key: key.to_string(),
            source,
        })?;

        // temp file + rename: readers never observe a partial record
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| LocalStoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| LocalStoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(key, path = %path.display(), "Stored local record");
        Ok(())
    }

    /// Remove a key. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), LocalStoreError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LocalStoreError::Io { path, source }),
        }
    }
}
