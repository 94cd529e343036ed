//! Built-in global scene defaults
//!
//! These sit at the least specific resolution ranks and make the `on`
//! and `off` scenes work for any light without site configuration.
//! Sites overlay their own defaults on top via the engine config.

use crate::tree::SettingTree;
use serde_json::{json, Value};

/// The built-in global settings tree
///
/// Dimmer and color state_high/state_low are deliberately inverted
/// (more ambient light, lower output) for scaled scenes.
pub fn global_defaults() -> SettingTree {
    let map = json!({
        "switch": {
            "on": { "state": "ON" },
            "off": { "state": "OFF" },
            "state": "OFF",
            "state_above": "OFF",
            "state_below": "ON"
        },
        "dimmer": {
            "on": { "state": 100 },
            "off": { "state": 0 },
            "state": 0,
            "state_high": 0,
            "state_low": 100,
            "state_above": 0,
            "state_below": 100
        },
        "color": {
            "on": { "state": 100 },
            "off": { "state": 0 },
            "state": 0,
            "state_high": 0,
            "state_low": 100,
            "state_above": 0,
            "state_below": 100
        }
    });

    match map {
        Value::Object(map) => map.into_iter().collect(),
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eos_core::{LightType, SceneName, SettingKey};
    use serde_json::json;

    #[test]
    fn test_builtin_on_off_scenes() {
        let defaults = global_defaults();
        assert_eq!(
            defaults.type_scene_setting(LightType::Switch, &SceneName::on(), SettingKey::State),
            Some(&json!("ON"))
        );
        assert_eq!(
            defaults.type_scene_setting(LightType::Dimmer, &SceneName::off(), SettingKey::State),
            Some(&json!(0))
        );
        assert_eq!(
            defaults.type_scene_setting(LightType::Color, &SceneName::on(), SettingKey::State),
            Some(&json!(100))
        );
    }
}
