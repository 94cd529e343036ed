//! Engine configuration loaded from YAML

use eos_scenes::{global_defaults, SettingTree};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Site configuration for the Eos engine
///
/// ```yaml
/// master_group: gEos
/// scene_item_suffix: _Scene
/// reload_item: Eos_Reload
/// scene_defaults:
///   dimmer:
///     evening: { state: 40 }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EosConfig {
    /// The group item all Eos lights and groups descend from
    pub master_group: String,

    /// Scene items are recognized by name affixes; at least one of the
    /// two must be set
    #[serde(default)]
    pub scene_item_prefix: String,
    #[serde(default)]
    pub scene_item_suffix: String,

    /// Switch item that triggers a rescan when it receives ON
    #[serde(default)]
    pub reload_item: Option<String>,

    /// Log every resolution step, very noisy
    #[serde(default)]
    pub log_trace: bool,

    /// Site overrides overlaid on the built-in scene defaults
    #[serde(default)]
    pub scene_defaults: IndexMap<String, serde_json::Value>,
}

impl EosConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading engine configuration");
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.master_group.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "'master_group' must be specified".to_string(),
            });
        }
        if self.scene_item_prefix.is_empty() && self.scene_item_suffix.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "at least one of 'scene_item_prefix' or 'scene_item_suffix' must be specified"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Whether an item name matches the configured scene item affixes
    pub fn is_scene_item_name(&self, name: &str) -> bool {
        name.starts_with(&self.scene_item_prefix) && name.ends_with(&self.scene_item_suffix)
    }

    /// The global settings tree: built-in defaults overlaid with the
    /// site's `scene_defaults`
    pub fn global_settings(&self) -> SettingTree {
        let mut tree = global_defaults();
        tree.overlay(self.scene_defaults.clone().into_iter().collect());
        tree
    }
}
