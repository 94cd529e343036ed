//! Per-item namespaced metadata configuration

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::storage::{Storage, StorageError, StorageFile, StorageResult};

/// Storage key for persisted metadata
const STORAGE_KEY: &str = "eos.metadata";
/// Storage format version
const STORAGE_VERSION: u32 = 1;

/// One metadata namespace on an item: a value plus a configuration tree
///
/// Matches the host's REST representation `{"value": ..., "config": {...}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub config: IndexMap<String, serde_json::Value>,
}

impl Metadata {
    /// Create metadata with a value and no configuration
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            config: IndexMap::new(),
        }
    }
}

/// The metadata registry stores namespaced key-value configuration per item
///
/// The scene engine reads the configuration tree fresh on every light
/// update; nothing in this registry is cached by its consumers.
pub struct MetadataRegistry {
    /// item name -> namespace -> metadata
    entries: DashMap<String, HashMap<String, Metadata>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Get the full metadata of a namespace on an item
    pub fn get(&self, item: &str, namespace: &str) -> Option<Metadata> {
        self.entries
            .get(item)
            .and_then(|ns| ns.get(namespace).cloned())
    }

    /// Get just the namespace value of an item
    pub fn get_value(&self, item: &str, namespace: &str) -> Option<String> {
        self.get(item, namespace).and_then(|m| m.value)
    }

    /// Get just the configuration tree of a namespace on an item
    pub fn get_config(&self, item: &str, namespace: &str) -> IndexMap<String, serde_json::Value> {
        self.get(item, namespace).map(|m| m.config).unwrap_or_default()
    }

    /// Create or modify item metadata
    ///
    /// With `overwrite` the namespace is replaced wholesale; otherwise
    /// the provided configuration keys are overlaid on the existing
    /// ones and a `None` value keeps the current namespace value.
    pub fn set(
        &self,
        item: &str,
        namespace: &str,
        value: Option<String>,
        config: IndexMap<String, serde_json::Value>,
        overwrite: bool,
    ) {
        let mut entry = self.entries.entry(item.to_string()).or_default();
        let existing = entry.get(namespace);

        let metadata = match existing {
            Some(current) if !overwrite => {
                let mut merged = current.clone();
                if value.is_some() {
                    merged.value = value;
                }
                merged.config.extend(config);
                merged
            }
            _ => Metadata { value, config },
        };

        trace!(item, namespace, "Setting metadata");
        entry.insert(namespace.to_string(), metadata);
    }

    /// Remove a namespace from an item
    pub fn remove(&self, item: &str, namespace: &str) -> Option<Metadata> {
        self.entries
            .get_mut(item)
            .and_then(|mut ns| ns.remove(namespace))
    }

    /// Number of items carrying any metadata
    pub fn item_count(&self) -> usize {
        self.entries.len()
    }

    /// Persist all metadata to storage
    pub async fn save(&self, storage: &Storage) -> StorageResult<()> {
        let data: HashMap<String, HashMap<String, Metadata>> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let file = StorageFile::new(STORAGE_KEY, data, STORAGE_VERSION);
        storage.save(&file).await?;
        debug!(items = self.entries.len(), "Persisted metadata registry");
        Ok(())
    }

    /// Load metadata from storage, replacing the in-memory contents
    pub async fn load(&self, storage: &Storage) -> StorageResult<()> {
        let Some(file) = storage
            .load::<HashMap<String, HashMap<String, Metadata>>>(STORAGE_KEY)
            .await?
        else {
            debug!("No persisted metadata found");
            return Ok(());
        };
        if file.version != STORAGE_VERSION {
            return Err(StorageError::VersionMismatch {
                key: STORAGE_KEY.to_string(),
                expected: STORAGE_VERSION,
                found: file.version,
            });
        }

        self.entries.clear();
        for (item, namespaces) in file.data {
            self.entries.insert(item, namespaces);
        }
        debug!(items = self.entries.len(), "Loaded metadata registry");
        Ok(())
    }
}

impl Default for MetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for MetadataRegistry
pub type SharedMetadataRegistry = Arc<MetadataRegistry>;
