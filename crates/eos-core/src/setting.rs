//! Scene setting keys and their typed values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed enumeration of scene setting keys
///
/// Each key carries a list of resolution ranks (1 = most specific, 10 =
/// least) at which it may be defined; `resolve` never returns a value
/// from a rank outside this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    State,
    StateAbove,
    StateBelow,
    StateHigh,
    StateLow,
    LevelSource,
    LevelThreshold,
    LevelHigh,
    LevelLow,
    MotionSource,
    MotionActive,
    MotionState,
    MotionScene,
}

impl SettingKey {
    /// All keys, in editor display order
    pub const ALL: [SettingKey; 13] = [
        Self::State,
        Self::StateAbove,
        Self::StateBelow,
        Self::StateHigh,
        Self::StateLow,
        Self::LevelSource,
        Self::LevelThreshold,
        Self::LevelHigh,
        Self::LevelLow,
        Self::MotionSource,
        Self::MotionActive,
        Self::MotionState,
        Self::MotionScene,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::StateAbove => "state_above",
            Self::StateBelow => "state_below",
            Self::StateHigh => "state_high",
            Self::StateLow => "state_low",
            Self::LevelSource => "level_source",
            Self::LevelThreshold => "level_threshold",
            Self::LevelHigh => "level_high",
            Self::LevelLow => "level_low",
            Self::MotionSource => "motion_source",
            Self::MotionActive => "motion_active",
            Self::MotionState => "motion_state",
            Self::MotionScene => "motion_scene",
        }
    }

    /// The resolution ranks at which this key may be defined
    ///
    /// The `state*` keys are restricted to scene-scoped ranks plus the
    /// group fallbacks; this table is carried over verbatim from
    /// deployed metadata and must not be "fixed".
    pub fn depths(&self) -> &'static [u8] {
        match self {
            Self::State
            | Self::StateAbove
            | Self::StateBelow
            | Self::StateHigh
            | Self::StateLow => &[1, 2, 3, 4, 7, 8],
            _ => &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        }
    }

    /// Whether this key may be defined at the given rank
    pub fn allowed_at(&self, rank: u8) -> bool {
        self.depths().contains(&rank)
    }
}

impl FromStr for SettingKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved scene setting value
///
/// Metadata values arrive as JSON from the host's metadata store; the
/// original sources additionally stored numbers and lists as strings,
/// so string values are re-parsed here ("100" resolves as a number,
/// "30,50,100" as a list, "ON" stays text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<SettingValue>),
}

impl SettingValue {
    /// Interpret a raw metadata value, or None for null-ish values
    pub fn parse(raw: &serde_json::Value) -> Option<Self> {
        match raw {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Self::parse_str(s),
            serde_json::Value::Array(items) => Some(Self::List(
                items.iter().filter_map(Self::parse).collect(),
            )),
            serde_json::Value::Object(_) => None,
        }
    }

    /// Interpret a string value the way the original `resolve_type` did
    pub fn parse_str(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "none" | "null" => return None,
            "true" => return Some(Self::Bool(true)),
            "false" => return Some(Self::Bool(false)),
            _ => {}
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            return Some(Self::Number(n));
        }
        // "30,50,100" and "[30,50,100]" both parse as lists
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(trimmed);
        if inner.contains(',') {
            let parts: Vec<f64> = inner
                .split(',')
                .map(|p| p.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .ok()?;
            return Some(Self::List(
                parts.into_iter().map(Self::Number).collect(),
            ));
        }
        Some(Self::Text(trimmed.to_string()))
    }

    /// The numeric value, if this is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The text value, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Interpret as an HSB triple (hue, saturation, brightness)
    pub fn as_hsb(&self) -> Option<[f64; 3]> {
        match self {
            Self::List(items) if items.len() == 3 => {
                let mut hsb = [0.0; 3];
                for (slot, item) in hsb.iter_mut().zip(items) {
                    *slot = item.as_f64()?;
                }
                Some(hsb)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

impl From<f64> for SettingValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
