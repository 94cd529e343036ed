//! Scene type classification

use eos_core::{LightType, SceneName, SceneType, SettingKey};

use crate::resolve::scene_setting;
use crate::tree::SettingsSnapshot;

/// Determine the scene type for `scene` on a light of `light_type`
///
/// The scan runs in two passes over widening depth windows: ranks 1-5
/// (the scene-scoped ranks) first, then 6-10. Deployed metadata was
/// written against this precedence boundary, so it is preserved rather
/// than collapsed into a single 1-10 scan.
///
/// Per rank the decision order is: `state` present means fixed; a
/// switch with `level_threshold` is threshold; a dimmer or color light
/// with `level_high`/`level_low` (or, below rank 5, `state_high`/
/// `state_low`) is scaled, otherwise `level_threshold` means threshold.
///
/// Returns None when no rank yields a classification; the caller must
/// leave the device untouched and log an error.
pub fn scene_type(
    snapshot: &SettingsSnapshot,
    scene: &SceneName,
    light_type: LightType,
) -> Option<SceneType> {
    scan(snapshot, scene, light_type, 1, 5).or_else(|| scan(snapshot, scene, light_type, 6, 10))
}

fn scan(
    snapshot: &SettingsSnapshot,
    scene: &SceneName,
    light_type: LightType,
    min_depth: u8,
    max_depth: u8,
) -> Option<SceneType> {
    let present = |key: SettingKey, depth: u8| {
        scene_setting(snapshot, scene, Some(light_type), key, depth, 1).is_some()
    };

    for depth in min_depth..=max_depth {
        if present(SettingKey::State, depth) {
            return Some(SceneType::Fixed);
        }
        match light_type {
            LightType::Switch => {
                if present(SettingKey::LevelThreshold, depth) {
                    return Some(SceneType::Threshold);
                }
            }
            LightType::Dimmer | LightType::Color => {
                if present(SettingKey::LevelHigh, depth) || present(SettingKey::LevelLow, depth) {
                    return Some(SceneType::Scaled);
                }
                // state_high/state_low only imply a scaled scene inside
                // the scene-scoped half of the scan
                if depth < 5
                    && (present(SettingKey::StateHigh, depth)
                        || present(SettingKey::StateLow, depth))
                {
                    return Some(SceneType::Scaled);
                }
                if present(SettingKey::LevelThreshold, depth) {
                    return Some(SceneType::Threshold);
                }
            }
        }
    }
    None
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
    fn test_fixed_wins_over_other_keys() {
        // `state` resolvable at any scanned rank forces fixed even with
        // scaling keys present
        let snapshot = SettingsSnapshot::new(
            tree(json!({"movie": {"state": 20, "level_high": 500, "level_source": "Lux"}})),
            SettingTree::new(),
            SettingTree::new(),
        );
        assert_eq!(
            scene_type(&snapshot, &scene("movie"), LightType::Dimmer),
            Some(SceneType::Fixed)
        );
    }

    #[test]
    fn test_switch_threshold() {
        let snapshot = SettingsSnapshot::new(
            tree(json!({"auto": {"level_threshold": 300}})),
            SettingTree::new(),
            SettingTree::new(),
        );
        assert_eq!(
            scene_type(&snapshot, &scene("auto"), LightType::Switch),
            Some(SceneType::Threshold)
        );
    }

    #[test]
    fn test_switch_ignores_scaling_keys() {
        let snapshot = SettingsSnapshot::new(
            tree(json!({"auto": {"level_high": 500}})),
            SettingTree::new(),
            SettingTree::new(),
        );
        assert_eq!(scene_type(&snapshot, &scene("auto"), LightType::Switch), None);
    }

    #[test]
    fn test_dimmer_scaled_beats_threshold() {
        let snapshot = SettingsSnapshot::new(
            tree(json!({"auto": {"level_high": 500, "level_threshold": 300}})),
            SettingTree::new(),
            SettingTree::new(),
        );
        assert_eq!(
            scene_type(&snapshot, &scene("auto"), LightType::Dimmer),
            Some(SceneType::Scaled)
        );
    }

    #[test]
    fn test_more_specific_rank_decides_first() {
        // the item scene defines a threshold at rank 1; the group scene
        // defines `state` only at rank 3, so the narrow window at
        // depth 1 classifies threshold before the state is ever seen...
        let snapshot = SettingsSnapshot::new(
            tree(json!({"auto": {"level_threshold": 300}})),
            tree(json!({"auto": {"state": "ON"}})),
            SettingTree::new(),
        );
        assert_eq!(
            scene_type(&snapshot, &scene("auto"), LightType::Switch),
            Some(SceneType::Threshold)
        );

        // ...but widening the window by one rank lets `state` win the
        // per-rank decision order
        let snapshot = SettingsSnapshot::new(
            tree(json!({"auto": {"level_threshold": 300}})),
            tree(json!({"dimmer": {"auto": {"state": 50}}})),
            SettingTree::new(),
        );
        assert_eq!(
            scene_type(&snapshot, &scene("auto"), LightType::Dimmer),
            Some(SceneType::Fixed)
        );
    }

    #[test]
    fn test_state_high_only_scaled_in_scene_half() {
        // state_high at group type level (rank 7) is only reachable in
        // the second pass where the depth guard suppresses it
        let snapshot = SettingsSnapshot::new(
            SettingTree::new(),
            tree(json!({"dimmer": {"state_high": 80}})),
            SettingTree::new(),
        );
        assert_eq!(scene_type(&snapshot, &scene("auto"), LightType::Dimmer), None);

        // but state_high inside a scene (rank 1) classifies scaled
        let snapshot = SettingsSnapshot::new(
            tree(json!({"auto": {"state_high": 80}})),
            SettingTree::new(),
            SettingTree::new(),
        );
        assert_eq!(
            scene_type(&snapshot, &scene("auto"), LightType::Dimmer),
            Some(SceneType::Scaled)
        );
    }

    #[test]
    fn test_builtin_defaults_classify_on_off_fixed() {
        let snapshot = SettingsSnapshot::new(
            SettingTree::new(),
            SettingTree::new(),
            crate::defaults::global_defaults(),
        );
        for light_type in [LightType::Switch, LightType::Dimmer, LightType::Color] {
            assert_eq!(
                scene_type(&snapshot, &SceneName::on(), light_type),
                Some(SceneType::Fixed)
            );
            assert_eq!(
                scene_type(&snapshot, &SceneName::off(), light_type),
                Some(SceneType::Fixed)
            );
        }
    }

    #[test]
    fn test_unconfigured_scene_is_none() {
        let snapshot = SettingsSnapshot::default();
        assert_eq!(scene_type(&snapshot, &scene("movie"), LightType::Color), None);
    }
}
