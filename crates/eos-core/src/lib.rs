//! Core types for Eos Lighting
//!
//! This crate provides the fundamental types used throughout the Eos
//! Rust implementation: ItemName, ItemState, LightType, SceneName,
//! SettingKey, SettingValue, and the event types carried by the bus.

mod event;
mod item;
mod light;
mod scene;
mod setting;

pub use event::{Event, EventData, EventType};
pub use item::{ItemName, ItemNameError, ItemState, ItemType};
pub use light::LightType;
pub use scene::{SceneName, SceneType};
pub use setting::{SettingKey, SettingValue};

/// Metadata namespace under which all Eos configuration lives
pub const META_NAMESPACE: &str = "eos";

/// Metadata values that disable Eos for an item
pub const META_STRING_FALSE: [&str; 4] = ["false", "disabled", "off", "no"];

/// Metadata key controlling whether a group follows its parent's scene
pub const META_KEY_FOLLOW_PARENT: &str = "follow_parent";

/// Standard event types used by Eos
pub mod events {
    use super::*;
    use serde::{Deserialize, Serialize};

    /// Event type for commands sent to an item
    pub const ITEM_COMMAND: &str = "item_command";

    /// Event type for state updates (fired on every update)
    pub const ITEM_STATE_UPDATED: &str = "item_state_updated";

    /// Event type for state changes (fired only when the value changed)
    pub const ITEM_STATE_CHANGED: &str = "item_state_changed";

    /// Data for ITEM_COMMAND events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ItemCommandData {
        pub item: ItemName,
        pub command: String,
    }

    impl EventData for ItemCommandData {
        fn event_type() -> &'static str {
            ITEM_COMMAND
        }
    }

    /// Data for ITEM_STATE_UPDATED events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ItemStateUpdatedData {
        pub item: ItemName,
        pub state: ItemState,
    }

    impl EventData for ItemStateUpdatedData {
        fn event_type() -> &'static str {
            ITEM_STATE_UPDATED
        }
    }

    /// Data for ITEM_STATE_CHANGED events
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ItemStateChangedData {
        pub item: ItemName,
        pub old_state: Option<ItemState>,
        pub new_state: ItemState,
    }

    impl EventData for ItemStateChangedData {
        fn event_type() -> &'static str {
            ITEM_STATE_CHANGED
        }
    }
}
