//! Scene names and scene types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scene name (e.g. "on", "off", "movie")
///
/// Scene names are compared case-insensitively; they are stored
/// lowercased. The names "parent" and "manual" are reserved: "parent"
/// makes a group inherit its parent group's scene and "manual" leaves
/// the lights untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SceneName(String);

impl SceneName {
    pub const ON: &'static str = "on";
    pub const OFF: &'static str = "off";
    pub const PARENT: &'static str = "parent";
    pub const MANUAL: &'static str = "manual";

    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn on() -> Self {
        Self(Self::ON.to_string())
    }

    pub fn off() -> Self {
        Self(Self::OFF.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_parent(&self) -> bool {
        self.0 == Self::PARENT
    }

    pub fn is_manual(&self) -> bool {
        self.0 == Self::MANUAL
    }
}

impl From<String> for SceneName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SceneName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<SceneName> for String {
    fn from(scene: SceneName) -> String {
        scene.0
    }
}

impl fmt::Display for SceneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a scene's output state is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneType {
    /// A literal state from the `state` setting
    Fixed,
    /// `state_above`/`state_below` selected by comparing a source item
    /// against `level_threshold`
    Threshold,
    /// Linear interpolation between `state_low` and `state_high` driven
    /// by a source item between `level_low` and `level_high`
    Scaled,
}

impl SceneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Threshold => "threshold",
            Self::Scaled => "scaled",
        }
    }
}

impl fmt::Display for SceneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_name_normalized() {
        assert_eq!(SceneName::new(" Movie ").as_str(), "movie");
        assert_eq!(SceneName::new("ON"), SceneName::on());
    }

    #[test]
    fn test_reserved_names() {
        assert!(SceneName::new("parent").is_parent());
        assert!(SceneName::new("Manual").is_manual());
        assert!(!SceneName::on().is_parent());
    }
}
