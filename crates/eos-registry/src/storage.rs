//! Versioned JSON persistence for registry data
//!
//! Registry contents are written as versioned JSON files in a storage
//! directory, atomically (temp file + rename).

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage file not found: {key}")]
    NotFound { key: String },

    #[error("version mismatch for {key}: expected {expected}, found {found}")]
    VersionMismatch {
        key: String,
        expected: u32,
        found: u32,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage file wrapper with version tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    /// Format version of the stored data
    pub version: u32,
    /// Storage key (file identifier)
    pub key: String,
    /// The actual data
    pub data: T,
}

impl<T> StorageFile<T> {
    /// Create a new storage file
    pub fn new(key: impl Into<String>, data: T, version: u32) -> Self {
        Self {
            version,
            key: key.into(),
            data,
        }
    }
}

/// Storage manager for a data directory
#[derive(Debug, Clone)]
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    /// Create a new storage manager rooted at `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the file path for a storage key
    pub fn file_path(&self, key: &str) -> PathBuf {
        self.storage_dir.join(format!("{key}.json"))
    }

    /// Check if a storage key exists
    pub fn exists(&self, key: &str) -> bool {
        self.file_path(key).exists()
    }

    /// Load data from storage
    ///
    /// Returns None if the file doesn't exist.
    pub async fn load<T>(&self, key: &str) -> StorageResult<Option<StorageFile<T>>>
    where
        T: DeserializeOwned,
    {
        let path = self.file_path(key);

        if !path.exists() {
            debug!(key, "Storage file not found");
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let file: StorageFile<T> = serde_json::from_str(&content)?;
        debug!(key, version = file.version, "Loaded storage file");
        Ok(Some(file))
    }

    /// Load data from storage, returning an error if not found
    pub async fn load_required<T>(&self, key: &str) -> StorageResult<StorageFile<T>>
    where
        T: DeserializeOwned,
    {
        self.load(key).await?.ok_or_else(|| StorageError::NotFound {
            key: key.to_string(),
        })
    }

    /// Save data to storage
    ///
    /// Writes to a temp file first, then renames, so readers never see
    /// a partial file.
    pub async fn save<T>(&self, file: &StorageFile<T>) -> StorageResult<()>
    where
        T: Serialize,
    {
        if !self.storage_dir.exists() {
            fs::create_dir_all(&self.storage_dir).await?;
        }

        let path = self.file_path(&file.key);
        let temp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(file)?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;

        debug!(key = %file.key, version = file.version, "Saved storage file");
        Ok(())
    }

    /// Delete a storage file
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.file_path(key);
        if path.exists() {
            fs::remove_file(&path).await?;
            debug!(key, "Deleted storage file");
        }
        Ok(())
    }
}
