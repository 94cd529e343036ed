//! Light type derived from an item's declared type

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ItemType;

/// The kind of light an item represents, determining which scene types
/// and settings apply to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    Switch,
    Dimmer,
    Color,
}

impl LightType {
    /// Derive the light type from the underlying item type
    ///
    /// Number items are driven like dimmers. Returns None for item types
    /// that cannot be Eos lights; callers must fall back to the item's
    /// current raw state in that case.
    pub fn from_item_type(item_type: ItemType) -> Option<Self> {
        match item_type {
            ItemType::Switch => Some(Self::Switch),
            ItemType::Dimmer | ItemType::Number => Some(Self::Dimmer),
            ItemType::Color => Some(Self::Color),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::Dimmer => "dimmer",
            Self::Color => "color",
        }
    }

    /// Dimmers and color lights share the scaled/level settings
    pub fn is_dimmable(&self) -> bool {
        matches!(self, Self::Dimmer | Self::Color)
    }
}

impl fmt::Display for LightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
