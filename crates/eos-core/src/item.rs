//! Item naming, typing, and tri-state values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid item names
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemNameError {
    #[error("item name cannot be empty")]
    Empty,

    #[error("item name cannot start with a digit")]
    LeadingDigit,

    #[error("item name contains invalid characters (must be alphanumeric with underscores)")]
    InvalidChars,
}

/// Name of an item in the host registry (e.g. "Kitchen_Light")
///
/// Item names are alphanumeric with underscores and must not start with
/// a digit, matching the host platform's item naming rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemName(String);

impl ItemName {
    /// Create a new ItemName, validating the host naming rules
    pub fn new(name: impl Into<String>) -> Result<Self, ItemNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ItemNameError::Empty);
        }
        if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return Err(ItemNameError::LeadingDigit);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ItemNameError::InvalidChars);
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the name starts with `prefix` and ends with `suffix`
    ///
    /// Used to recognize scene items by their configured affixes.
    pub fn has_affixes(&self, prefix: &str, suffix: &str) -> bool {
        self.0.starts_with(prefix) && self.0.ends_with(suffix)
    }
}

impl FromStr for ItemName {
    type Err = ItemNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ItemName {
    type Error = ItemNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ItemName> for String {
    fn from(name: ItemName) -> String {
        name.0
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The declared type of an item in the host registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ItemType {
    Switch,
    Dimmer,
    Color,
    Number,
    String,
    Contact,
    Group,
}

impl ItemType {
    /// Parse a type name as reported by the host REST API (e.g. "Dimmer")
    pub fn parse(s: &str) -> Option<Self> {
        // REST reports types like "Number:Illuminance"; the base type is
        // everything before the first ':'
        let base = s.split(':').next().unwrap_or(s);
        match base.to_ascii_lowercase().as_str() {
            "switch" => Some(Self::Switch),
            "dimmer" => Some(Self::Dimmer),
            "color" => Some(Self::Color),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "contact" => Some(Self::Contact),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Switch => "Switch",
            Self::Dimmer => "Dimmer",
            Self::Color => "Color",
            Self::Number => "Number",
            Self::String => "String",
            Self::Contact => "Contact",
            Self::Group => "Group",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tri-state value of an item
///
/// The host registry reports either a defined value, NULL (never set),
/// or UNDEF (set to undefined, e.g. after a binding error).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemState {
    /// The item has never been given a state
    Null,
    /// The item's state was explicitly undefined
    Undef,
    /// A defined state value, stored in the host's string representation
    Value(String),
}

impl ItemState {
    /// Create a defined state from anything stringly
    pub fn value(v: impl Into<String>) -> Self {
        Self::Value(v.into())
    }

    /// True for NULL and UNDEF
    pub fn is_undefined(&self) -> bool {
        !matches!(self, Self::Value(_))
    }

    /// The defined value, if any
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Parse the state as a number, if defined and numeric
    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(|v| v.trim().parse().ok())
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Undef => write!(f, "UNDEF"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}
