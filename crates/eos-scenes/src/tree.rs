//! Nested setting trees and the per-evaluation snapshot

use eos_core::{LightType, SceneName, SettingKey};
use indexmap::IndexMap;
use serde_json::Value;

/// A nested settings tree as stored in item metadata
///
/// Keys at the top level are either setting keys, scene names, or light
/// type names; scenes and light types nest one or two levels deeper:
///
/// ```json
/// {
///   "level_source": "Lux_Sensor",
///   "on": { "state": 100 },
///   "dimmer": { "on": { "state": 100 }, "state_low": 100 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingTree(IndexMap<String, Value>);

impl SettingTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A setting defined directly at the top level of this tree
    pub fn setting(&self, key: SettingKey) -> Option<&Value> {
        non_null(self.0.get(key.as_str()))
    }

    /// A setting under a scene (`tree[scene][key]`)
    pub fn scene_setting(&self, scene: &SceneName, key: SettingKey) -> Option<&Value> {
        non_null(self.0.get(scene.as_str()).and_then(|s| s.get(key.as_str())))
    }

    /// A setting under a light type (`tree[type][key]`)
    pub fn type_setting(&self, light_type: LightType, key: SettingKey) -> Option<&Value> {
        non_null(
            self.0
                .get(light_type.as_str())
                .and_then(|t| t.get(key.as_str())),
        )
    }

    /// A setting under a scene under a light type (`tree[type][scene][key]`)
    pub fn type_scene_setting(
        &self,
        light_type: LightType,
        scene: &SceneName,
        key: SettingKey,
    ) -> Option<&Value> {
        non_null(
            self.0
                .get(light_type.as_str())
                .and_then(|t| t.get(scene.as_str()))
                .and_then(|s| s.get(key.as_str())),
        )
    }

    /// Overlay another tree on this one, replacing top-level keys
    ///
    /// Deliberately shallow, matching how the original overlaid
    /// user-supplied scene defaults onto the built-in ones.
    pub fn overlay(&mut self, other: SettingTree) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Every `level_source` item name mentioned anywhere in the tree
    pub fn level_sources(&self) -> Vec<String> {
        self.sources_for(SettingKey::LevelSource)
    }

    /// Every `motion_source` item name mentioned anywhere in the tree
    pub fn motion_sources(&self) -> Vec<String> {
        self.sources_for(SettingKey::MotionSource)
    }

    fn sources_for(&self, key: SettingKey) -> Vec<String> {
        let mut sources = Vec::new();
        for value in self.0.values() {
            collect_sources(value, key, &mut sources);
        }
        if let Some(direct) = self.setting(key).and_then(Value::as_str) {
            sources.push(direct.to_string());
        }
        sources.sort();
        sources.dedup();
        sources
    }

    /// Scene names defined at the top level of this tree
    ///
    /// Any object-valued key that is neither a setting key nor a light
    /// type name is a scene.
    pub fn scene_names(&self) -> Vec<String> {
        const TYPE_NAMES: [&str; 3] = ["switch", "dimmer", "color"];
        self.0
            .iter()
            .filter(|(key, value)| {
                value.is_object()
                    && key.parse::<SettingKey>().is_err()
                    && !TYPE_NAMES.contains(&key.as_str())
            })
            .map(|(key, _)| key.clone())
            .collect()
    }
}

fn non_null<'a>(value: Option<&'a Value>) -> Option<&'a Value> {
    value.filter(|v| !v.is_null())
}

fn collect_sources(value: &Value, source_key: SettingKey, sources: &mut Vec<String>) {
    if let Value::Object(map) = value {
        for (key, nested) in map {
            if key == source_key.as_str() {
                if let Some(name) = nested.as_str() {
                    sources.push(name.to_string());
                }
            } else {
                collect_sources(nested, source_key, sources);
            }
        }
    }
}

impl From<IndexMap<String, Value>> for SettingTree {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for SettingTree {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The flattened configuration scanned by the resolver
///
/// Captured fresh from the metadata store on every light update and
/// never cached; resolution only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct SettingsSnapshot {
    /// The light item's own `eos` configuration tree
    pub item: SettingTree,
    /// The configuration tree of the light's Eos group
    pub group: SettingTree,
    /// Global defaults (built-ins overlaid with site configuration)
    pub global: SettingTree,
}

impl SettingsSnapshot {
    pub fn new(item: SettingTree, group: SettingTree, global: SettingTree) -> Self {
        Self { item, group, global }
    }
}
