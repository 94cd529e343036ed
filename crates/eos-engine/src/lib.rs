//! Scene evaluation and orchestration engine
//!
//! Ties the registries, the event bus, and the scene resolver together:
//! discovers the Eos group hierarchy, listens for scene commands and
//! light or sensor updates, and keeps every light on its current scene.

pub mod config;
pub mod discovery;
pub mod engine;
pub mod update;

pub use config::{ConfigError, ConfigResult, EosConfig};
pub use discovery::{Discovery, Topology};
pub use engine::{EngineError, EngineResult, EosEngine};
pub use update::Updater;
