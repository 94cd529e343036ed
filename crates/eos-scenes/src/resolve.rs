//! Depth-ranked setting resolution
//!
//! A setting is searched across ten resolution ranks, most specific
//! first; the first rank that defines it wins outright (first-match,
//! never merge):
//!
//!  1. scene in item          6. item
//!  2. scene in type in group 7. type in group
//!  3. scene in group         8. group
//!  4. scene in type in global 9. type in global
//!  5. scene in global       10. global

use eos_core::{LightType, SceneName, SettingKey, SettingValue};
use serde_json::Value;

use crate::tree::SettingsSnapshot;

/// Lowest (most specific) resolution rank
pub const MIN_DEPTH: u8 = 1;
/// Highest (least specific) resolution rank
pub const MAX_DEPTH: u8 = 10;

/// Resolve `key` for `scene` against a settings snapshot
///
/// Scans ranks from `min_depth` up to `max_depth`, skipping ranks not
/// in the key's depth list, and returns the parsed value from the first
/// rank where the raw setting is present. Returns None when the key is
/// absent at every scanned rank. Deterministic and total: exactly one
/// value or None, never an ambiguity.
///
/// With an unknown light type (`None`), the type-scoped ranks 2, 4, 7,
/// and 9 never match.
pub fn scene_setting(
    snapshot: &SettingsSnapshot,
    scene: &SceneName,
    light_type: Option<LightType>,
    key: SettingKey,
    max_depth: u8,
    min_depth: u8,
) -> Option<SettingValue> {
    for rank in min_depth..=max_depth.min(MAX_DEPTH) {
        if !key.allowed_at(rank) {
            continue;
        }
        if let Some(raw) = setting_at_rank(snapshot, scene, light_type, key, rank) {
            // first present rank wins, even if its value parses to None
            return SettingValue::parse(raw);
        }
    }
    None
}

/// Resolve `key` across the full depth window
pub fn resolve(
    snapshot: &SettingsSnapshot,
    scene: &SceneName,
    light_type: Option<LightType>,
    key: SettingKey,
) -> Option<SettingValue> {
    scene_setting(snapshot, scene, light_type, key, MAX_DEPTH, MIN_DEPTH)
}

/// The raw value of `key` at exactly one resolution rank
fn setting_at_rank<'a>(
    snapshot: &'a SettingsSnapshot,
    scene: &SceneName,
    light_type: Option<LightType>,
    key: SettingKey,
    rank: u8,
) -> Option<&'a Value> {
    match rank {
        1 => snapshot.item.scene_setting(scene, key),
        2 => snapshot.group.type_scene_setting(light_type?, scene, key),
        3 => snapshot.group.scene_setting(scene, key),
        4 => snapshot.global.type_scene_setting(light_type?, scene, key),
        5 => snapshot.global.scene_setting(scene, key),
        6 => snapshot.item.setting(key),
        7 => snapshot.group.type_setting(light_type?, key),
        8 => snapshot.group.setting(key),
        9 => snapshot.global.type_setting(light_type?, key),
        10 => snapshot.global.setting(key),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SettingTree;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> SettingTree {
        match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => panic!("tree must be an object"),
        }
    }

    fn scene(name: &str) -> SceneName {
        SceneName::new(name)
    }

    #[test]
    fn test_most_specific_scope_wins() {
        let snapshot = SettingsSnapshot::new(
            tree(json!({"on": {"state": 42}})),
            tree(json!({"on": {"state": 13}})),
            tree(json!({"on": {"state": 7}, "state_above": 99})),
        );
        assert_eq!(
            resolve(&snapshot, &scene("on"), Some(LightType::Dimmer), SettingKey::State),
            Some(SettingValue::Number(42.0))
        );
    }

    #[test]
    fn test_rank_order_across_scopes() {
        // group type-scene (rank 2) beats group scene (rank 3) and
        // everything global
        let snapshot = SettingsSnapshot::new(
            SettingTree::new(),
            tree(json!({
                "dimmer": {"evening": {"state": 60}},
                "evening": {"state": 30},
            })),
            tree(json!({"evening": {"state": 10}})),
        );
        assert_eq!(
            resolve(&snapshot, &scene("evening"), Some(LightType::Dimmer), SettingKey::State),
            Some(SettingValue::Number(60.0))
        );
    }

    #[test]
    fn test_depth_window() {
        let snapshot = SettingsSnapshot::new(
            tree(json!({"on": {"level_source": "A"}})),
            SettingTree::new(),
            tree(json!({"level_source": "B"})),
        );
        // full window finds the item-scene value
        assert_eq!(
            resolve(&snapshot, &scene("on"), Some(LightType::Dimmer), SettingKey::LevelSource),
            Some(SettingValue::Text("A".to_string()))
        );
        // window excluding rank 1 falls through to the global value
        assert_eq!(
            scene_setting(
                &snapshot,
                &scene("on"),
                Some(LightType::Dimmer),
                SettingKey::LevelSource,
                MAX_DEPTH,
                2,
            ),
            Some(SettingValue::Text("B".to_string()))
        );
        // capped window sees neither
        assert_eq!(
            scene_setting(
                &snapshot,
                &scene("on"),
                Some(LightType::Dimmer),
                SettingKey::LevelSource,
                5,
                2,
            ),
            None
        );
    }

    #[test]
    fn test_disallowed_rank_never_resolves() {
        // `state` is not allowed at ranks 9/10, so a global type-level
        // state never resolves even though the tree defines it
        let snapshot = SettingsSnapshot::new(
            SettingTree::new(),
            SettingTree::new(),
            tree(json!({"dimmer": {"state": 0}, "state": 5})),
        );
        assert_eq!(
            resolve(&snapshot, &scene("movie"), Some(LightType::Dimmer), SettingKey::State),
            None
        );
        // level keys are allowed everywhere
        let snapshot = SettingsSnapshot::new(
            SettingTree::new(),
            SettingTree::new(),
            tree(json!({"dimmer": {"level_threshold": 300}})),
        );
        assert_eq!(
            resolve(
                &snapshot,
                &scene("movie"),
                Some(LightType::Dimmer),
                SettingKey::LevelThreshold
            ),
            Some(SettingValue::Number(300.0))
        );
    }

    #[test]
    fn test_unknown_light_type_skips_type_ranks() {
        let snapshot = SettingsSnapshot::new(
            SettingTree::new(),
            tree(json!({"dimmer": {"on": {"state": 60}}})),
            tree(json!({"on": {"state": 10}})),
        );
        assert_eq!(
            resolve(&snapshot, &scene("on"), None, SettingKey::State),
            Some(SettingValue::Number(10.0))
        );
    }

    #[test]
    fn test_absent_everywhere_is_none() {
        let snapshot = SettingsSnapshot::default();
        assert_eq!(
            resolve(&snapshot, &scene("on"), Some(LightType::Color), SettingKey::LevelHigh),
            None
        );
    }

    #[test]
    fn test_stringly_values_are_parsed() {
        let snapshot = SettingsSnapshot::new(
            tree(json!({"on": {"state": "100"}})),
            SettingTree::new(),
            SettingTree::new(),
        );
        assert_eq!(
            resolve(&snapshot, &scene("on"), Some(LightType::Dimmer), SettingKey::State),
            Some(SettingValue::Number(100.0))
        );
    }
}
