//! Scene resolution for Eos lighting
//!
//! The heart of the system: settings are resolved across ten depth
//! ranks (most specific wins), a scene is classified as fixed,
//! threshold, or scaled, and the device-native state literal is
//! computed from the classification and live sensor values.
//!
//! Everything here is pure evaluation over a [`SettingsSnapshot`]
//! captured from the metadata store; live item reads go through the
//! [`ItemStates`] trait so the engine can plug in its registry.

pub mod classify;
pub mod compute;
pub mod defaults;
pub mod resolve;
pub mod tree;

pub use classify::scene_type;
pub use compute::{state_for_scene, ItemStates};
pub use defaults::global_defaults;
pub use resolve::{resolve, scene_setting, MAX_DEPTH, MIN_DEPTH};
pub use tree::{SettingTree, SettingsSnapshot};
