//! State calculation
//!
//! Turns a resolved scene into the device-native state literal to send.
//! Every failure path is non-fatal: the error is logged and the light's
//! current state is returned so the device is left untouched.

use eos_core::{ItemName, ItemState, LightType, SceneName, SceneType, SettingKey, SettingValue};
use tracing::{debug, error, warn};

use crate::classify::scene_type;
use crate::resolve::resolve;
use crate::tree::SettingsSnapshot;

/// Live item state lookup used by threshold/scaled/motion evaluation
///
/// Returns None when no item with that name exists in the registry.
pub trait ItemStates {
    fn state_of(&self, name: &str) -> Option<ItemState>;
}

/// Compute the state literal `item` should be commanded to for `scene`
///
/// Evaluation order: motion override, scene classification, then the
/// fixed/threshold/scaled calculation, and finally normalization into
/// the device's native representation. Any missing required setting
/// logs and returns the current state unchanged.
pub fn state_for_scene(
    snapshot: &SettingsSnapshot,
    scene: &SceneName,
    item: &ItemName,
    light_type: LightType,
    current_state: &ItemState,
    states: &dyn ItemStates,
) -> String {
    let mut scene = scene.clone();
    let setting =
        |scene: &SceneName, key: SettingKey| resolve(snapshot, scene, Some(light_type), key);
    let keep_current = || current_state.to_string();

    // motion trigger: an active motion source forces a fixed state or
    // redirects to another scene before classification
    let mut state: Option<SettingValue> = None;
    if let Some(source) = setting(&scene, SettingKey::MotionSource) {
        let source = source.to_string();
        match states.state_of(&source) {
            None => {
                error!(item = %item, motion_source = %source, "motion source item does not exist");
            }
            Some(source_state) => {
                let motion_active = setting(&scene, SettingKey::MotionActive);
                let motion_state = setting(&scene, SettingKey::MotionState);
                let motion_scene = setting(&scene, SettingKey::MotionScene)
                    .and_then(|v| v.as_text().map(str::to_string))
                    .filter(|s| !s.is_empty());
                match motion_active {
                    None => {
                        warn!(item = %item, scene = %scene, "motion triggers require 'motion_active', nothing found");
                    }
                    Some(_) if motion_state.is_none() && motion_scene.is_none() => {
                        warn!(item = %item, scene = %scene, "motion triggers require 'motion_state' or 'motion_scene', nothing found");
                    }
                    Some(active) => {
                        if source_state.to_string() == active.to_string() {
                            debug!(item = %item, scene = %scene, "motion trigger is active");
                            if let Some(motion_state) = motion_state {
                                state = Some(motion_state);
                            } else if let Some(motion_scene) = motion_scene {
                                scene = SceneName::new(motion_scene);
                            }
                        } else {
                            debug!(item = %item, scene = %scene, "motion trigger is not active");
                        }
                    }
                }
            }
        }
    }

    let Some(scene_type) = scene_type(snapshot, &scene, light_type) else {
        error!(item = %item, scene = %scene, "couldn't determine scene type");
        return keep_current();
    };

    let state = match (scene_type, state) {
        (_, Some(state)) => state,

        (SceneType::Fixed, None) => match setting(&scene, SettingKey::State) {
            Some(state) => state,
            None => {
                error!(item = %item, scene = %scene, "fixed type scenes require 'state', nothing found");
                return keep_current();
            }
        },

        (SceneType::Threshold, None) => {
            let Some(level_value) = source_level(snapshot, &scene, item, light_type, states) else {
                return keep_current();
            };
            let require = |key: SettingKey| match setting(&scene, key) {
                Some(value) => Some(value),
                None => {
                    error!(item = %item, scene = %scene, key = key.as_str(), "threshold type scenes require setting, nothing found");
                    None
                }
            };
            let Some(threshold) = require(SettingKey::LevelThreshold).and_then(|v| v.as_f64())
            else {
                return keep_current();
            };
            let Some(state_above) = require(SettingKey::StateAbove) else {
                return keep_current();
            };
            let Some(state_below) = require(SettingKey::StateBelow) else {
                return keep_current();
            };
            if level_value > threshold {
                state_above
            } else {
                state_below
            }
        }

        (SceneType::Scaled, None) => {
            let Some(level_value) = source_level(snapshot, &scene, item, light_type, states) else {
                return keep_current();
            };
            let require = |key: SettingKey| match setting(&scene, key) {
                Some(value) => Some(value),
                None => {
                    error!(item = %item, scene = %scene, key = key.as_str(), "scaling type scenes require setting, nothing found");
                    None
                }
            };
            let Some(level_high) = require(SettingKey::LevelHigh).and_then(|v| v.as_f64()) else {
                return keep_current();
            };
            let level_low = setting(&scene, SettingKey::LevelLow)
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let Some(state_high) = require(SettingKey::StateHigh) else {
                return keep_current();
            };
            let Some(state_low) = require(SettingKey::StateLow) else {
                return keep_current();
            };
            let state_above = setting(&scene, SettingKey::StateAbove).unwrap_or_else(|| state_high.clone());
            let state_below = setting(&scene, SettingKey::StateBelow).unwrap_or_else(|| state_low.clone());

            if level_value > level_high {
                state_above
            } else if level_value < level_low {
                state_below
            } else if level_high <= level_low {
                // equal bounds leave nothing to interpolate over
                error!(item = %item, scene = %scene, level_low, level_high, "scaling type scenes require 'level_low' < 'level_high'");
                return keep_current();
            } else {
                let factor = (level_value - level_low) / (level_high - level_low);
                let scale = |low: f64, high: f64| (low + (high - low) * factor).round();
                match (state_low.as_f64(), state_high.as_f64()) {
                    (Some(low), Some(high)) => SettingValue::Number(scale(low, high)),
                    _ => match (state_low.as_hsb(), state_high.as_hsb()) {
                        (Some(low), Some(high)) => SettingValue::List(
                            (0..3)
                                .map(|i| SettingValue::Number(scale(low[i], high[i])))
                                .collect(),
                        ),
                        _ => {
                            error!(item = %item, scene = %scene, "scaling endpoints must both be numbers or both HSB triples");
                            return keep_current();
                        }
                    },
                }
            }
        }
    };

    match normalize(&state, light_type, current_state) {
        Some(literal) => {
            debug!(item = %item, scene = %scene, scene_type = %scene_type, state = %literal, "determined state");
            literal
        }
        None => {
            warn!(item = %item, scene = %scene, state = %state, light_type = %light_type, "new state is not valid for item type");
            keep_current()
        }
    }
}

/// Read the live numeric value of the scene's `level_source` item
///
/// Logs and returns None when the setting is missing, the item does not
/// exist, or its state is undefined or non-numeric.
fn source_level(
    snapshot: &SettingsSnapshot,
    scene: &SceneName,
    item: &ItemName,
    light_type: LightType,
    states: &dyn ItemStates,
) -> Option<f64> {
    let Some(source) = resolve(snapshot, scene, Some(light_type), SettingKey::LevelSource) else {
        error!(item = %item, scene = %scene, "scene type requires 'level_source', nothing found");
        return None;
    };
    let source = source.to_string();
    let Some(source_state) = states.state_of(&source) else {
        error!(item = %item, scene = %scene, level_source = %source, "level source item does not exist");
        return None;
    };
    match source_state.as_f64() {
        Some(value) => Some(value),
        None => {
            warn!(item = %item, scene = %scene, level_source = %source, "level source item has no numeric value");
            None
        }
    }
}

/// Normalize a computed state into the device-native literal
///
/// Returns None when the value shape does not fit the light type.
fn normalize(
    state: &SettingValue,
    light_type: LightType,
    current_state: &ItemState,
) -> Option<String> {
    match light_type {
        LightType::Switch => {
            let text = state.as_text()?.to_ascii_uppercase();
            matches!(text.as_str(), "ON" | "OFF").then_some(text)
        }
        LightType::Dimmer => {
            let value = state.as_f64()?;
            Some(clamp_round(value, 0, 1_000_000).to_string())
        }
        LightType::Color => {
            if let Some(value) = state.as_f64() {
                // bare number adjusts brightness, keeping current hue
                // and saturation
                let current = match current_state.as_value() {
                    Some(v) => v.to_string(),
                    None => "0,0,0".to_string(),
                };
                let parts: Vec<&str> = current.split(',').collect();
                if parts.len() < 3 {
                    return None;
                }
                let brightness = clamp_round(value, 0, 100);
                Some(format!("{},{},{}", parts[0], parts[1], brightness))
            } else {
                let [mut hue, saturation, brightness] = state.as_hsb()?;
                if hue > 359.0 {
                    hue -= 359.0;
                } else if hue < 0.0 {
                    hue += 359.0;
                }
                let saturation = saturation.clamp(0.0, 100.0);
                let brightness = brightness.clamp(0.0, 100.0);
                if brightness == 0.0 {
                    // some devices report '0,0,0' for any zero-brightness
                    // color, so send that form to keep change detection
                    // working
                    return Some("0,0,0".to_string());
                }
                Some(
                    SettingValue::List(vec![
                        SettingValue::Number(hue),
                        SettingValue::Number(saturation),
                        SettingValue::Number(brightness),
                    ])
                    .to_string(),
                )
            }
        }
    }
}

fn clamp_round(value: f64, min: i64, max: i64) -> i64 {
    (value.round() as i64).clamp(min, max)
}
