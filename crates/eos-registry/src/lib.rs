//! Item and metadata registries for Eos
//!
//! This crate provides the in-process stand-ins for the host platform's
//! item registry and metadata registry: live item states with tri-state
//! semantics and per-item namespaced configuration trees. The scene
//! engine only reads these; scenes are created and edited externally
//! through the REST metadata editor.

mod item_registry;
mod metadata_registry;
mod storage;

pub use item_registry::{Item, ItemRegistry, SharedItemRegistry};
pub use metadata_registry::{Metadata, MetadataRegistry, SharedMetadataRegistry};
pub use storage::{Storage, StorageError, StorageFile, StorageResult};
