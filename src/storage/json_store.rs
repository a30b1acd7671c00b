//! Keyed JSON records on the local filesystem.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Error type for durable-state operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The record exists but cannot be decoded.
    #[error("corrupt record {name}: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode error: {0}")]
    Encode(serde_json::Error),
}

/// Directory of JSON documents, one per record name.
///
/// Writes go through a uniquely named temp file followed by a rename, so
/// concurrent writers and mid-write cancellation leave either the old or the
/// new record on disk, never a partial one.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Create the state directory if it does not exist.
    pub async fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Load a record. Missing file is `Ok(None)`; an undecodable file is
    /// `Err(Corrupt)` so the caller picks its own fail-open/fail-closed policy.
    pub async fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(name);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
            name: name.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    /// Persist a record atomically.
    pub async fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        self.ensure_dir().await?;
        let encoded = serde_json::to_vec_pretty(value).map_err(StoreError::Encode)?;
        let tmp = self.dir.join(format!(".{name}.{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, &encoded).await?;
        if let Err(e) = fs::rename(&tmp, self.path_for(name)).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Remove a record. Removing a missing record is a no-op.
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
