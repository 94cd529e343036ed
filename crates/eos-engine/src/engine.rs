//! The Eos engine
//!
//! This module provides the `EosEngine` which wires scene evaluation to
//! the event bus. It listens for commands on scene items, state updates
//! on lights and source items, and the optional reload switch, and
//! drives the `Updater` in response.

use eos_core::events::{ItemCommandData, ItemStateUpdatedData};
use eos_core::{ItemName, ItemType};
use eos_event_bus::EventBus;
use eos_registry::{SharedItemRegistry, SharedMetadataRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EosConfig};
use crate::discovery::Topology;
use crate::update::Updater;

/// Errors raised while starting the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("master group '{group}' does not exist")]
    MasterGroupMissing { group: String },

    #[error("master group '{group}' is not a Group item")]
    MasterGroupNotAGroup { group: String },

    #[error("master group '{group}' has no scene item")]
    MasterGroupNoSceneItem { group: String },
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Scene orchestration engine
///
/// Owns the discovered topology and reacts to bus traffic:
///
/// - a command to a scene item applies that scene to its group
/// - a state update on a light re-evaluates just that light
/// - a state update on a level or motion source re-evaluates everything
/// - ON to the reload item rescans the hierarchy
pub struct EosEngine {
    bus: Arc<EventBus>,
    items: SharedItemRegistry,
    updater: Arc<Updater>,
    topology: Arc<RwLock<Topology>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl EosEngine {
    pub fn new(
        bus: Arc<EventBus>,
        items: SharedItemRegistry,
        metadata: SharedMetadataRegistry,
        config: EosConfig,
    ) -> Self {
        let updater = Arc::new(Updater::new(items.clone(), metadata, config));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            bus,
            items,
            updater,
            topology: Arc::new(RwLock::new(Topology::default())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Start the engine
    ///
    /// Validates the master group, scans the hierarchy, applies the
    /// current scenes once, and begins processing events.
    pub async fn start(&self) -> EngineResult<()> {
        self.validate_master_group()?;

        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Eos engine already running");
            return Ok(());
        }

        info!("Starting Eos engine");

        let topology = self.updater.scan();
        info!(
            scene_items = topology.scene_items.len(),
            lights = topology.lights.len(),
            sources = topology.sources.len(),
            "Initialized Eos hierarchy"
        );
        *self.topology.write().await = topology;
        self.updater.update_all();

        let mut command_rx = self.bus.subscribe_typed::<ItemCommandData>();
        let mut update_rx = self.bus.subscribe_typed::<ItemStateUpdatedData>();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let items = self.items.clone();
        let updater = self.updater.clone();
        let topology = self.topology.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    command = command_rx.recv() => {
                        match command {
                            Ok(event) => {
                                Self::process_command(&event.data, &items, &updater, &topology).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("Eos engine lagged by {} commands", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                info!("Event bus closed, stopping Eos engine");
                                break;
                            }
                        }
                    }
                    update = update_rx.recv() => {
                        match update {
                            Ok(event) => {
                                Self::process_update(&event.data, &items, &updater, &topology).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("Eos engine lagged by {} updates", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                info!("Event bus closed, stopping Eos engine");
                                break;
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Received shutdown signal");
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Eos engine stopped");
        });

        Ok(())
    }

    /// Stop the engine
    pub fn stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        info!("Stopping Eos engine");
        let _ = self.shutdown_tx.send(());
    }

    /// Check if the engine is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Rescan the hierarchy and re-apply all scenes
    pub async fn reload(&self) {
        info!("Reinitializing Eos hierarchy");
        *self.topology.write().await = self.updater.scan();
        self.updater.update_all();
    }

    fn validate_master_group(&self) -> EngineResult<()> {
        let config = self.updater.config();
        let master = ItemName::new(config.master_group.clone()).map_err(|_| {
            EngineError::MasterGroupMissing {
                group: config.master_group.clone(),
            }
        })?;

        let Some(item) = self.items.get(&master) else {
            return Err(EngineError::MasterGroupMissing {
                group: master.to_string(),
            });
        };
        if item.item_type != ItemType::Group {
            return Err(EngineError::MasterGroupNotAGroup {
                group: master.to_string(),
            });
        }
        if self.updater.scene_item_of(&master).is_none() {
            return Err(EngineError::MasterGroupNoSceneItem {
                group: master.to_string(),
            });
        }
        Ok(())
    }

    /// React to a command on a scene item or the reload switch
    async fn process_command(
        command: &ItemCommandData,
        items: &SharedItemRegistry,
        updater: &Arc<Updater>,
        topology: &Arc<RwLock<Topology>>,
    ) {
        let item_name = command.item.as_str();

        if updater.config().reload_item.as_deref() == Some(item_name) {
            if command.command.eq_ignore_ascii_case("ON") {
                info!("Reload item received ON, reinitializing Eos hierarchy");
                *topology.write().await = updater.scan();
                updater.update_all();
            }
            return;
        }

        let group = {
            let topology = topology.read().await;
            topology.scene_items.get(item_name).cloned()
        };
        let Some(group) = group else {
            return;
        };
        debug!(scene_item = %command.item, command = %command.command, group = %group, "Scene command received");

        let Some(group) = items.get(&group) else {
            warn!(group = %group, "Scene item's group vanished from the registry");
            return;
        };
        updater.update_scene(&group);
    }

    /// React to a state update on a light or source item
    async fn process_update(
        update: &ItemStateUpdatedData,
        items: &SharedItemRegistry,
        updater: &Arc<Updater>,
        topology: &Arc<RwLock<Topology>>,
    ) {
        let item_name = update.item.as_str();
        let (is_light, is_source) = {
            let topology = topology.read().await;
            (
                topology.lights.contains(item_name),
                topology.sources.contains(item_name),
            )
        };

        if is_light {
            debug!(light = %update.item, state = %update.state, "Light received update");
            if let Some(light) = items.get(&update.item) {
                updater.update_light(&light);
            }
        } else if is_source {
            debug!(source = %update.item, state = %update.state, "Source received update");
            updater.update_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eos_core::{ItemState, META_NAMESPACE};
    use eos_registry::{Item, ItemRegistry, MetadataRegistry};
    use indexmap::IndexMap;
    use serde_json::json;
    use std::time::Duration;

    fn name(s: &str) -> ItemName {
        ItemName::new(s).unwrap()
    }

    struct Fixture {
        bus: Arc<EventBus>,
        items: SharedItemRegistry,
        metadata: SharedMetadataRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let bus = Arc::new(EventBus::new());
            Self {
                bus: bus.clone(),
                items: Arc::new(ItemRegistry::new(bus)),
                metadata: Arc::new(MetadataRegistry::new()),
            }
        }

        fn engine(&self, yaml: &str) -> EosEngine {
            let config = EosConfig::from_yaml(yaml).unwrap();
            EosEngine::new(
                self.bus.clone(),
                self.items.clone(),
                self.metadata.clone(),
                config,
            )
        }

        fn add_group(&self, group: &str, parent: Option<&str>) {
            let mut item = Item::new(name(group), ItemType::Group);
            if let Some(parent) = parent {
                item = item.in_groups([name(parent)]);
            }
            self.items.add(item);
            self.items.add(
                Item::new(name(&format!("{group}_Scene")), ItemType::String)
                    .in_groups([name(group)]),
            );
        }

        fn add_light(&self, light: &str, group: &str, item_type: ItemType) {
            self.items
                .add(Item::new(name(light), item_type).in_groups([name(group)]));
            self.metadata.set(
                light,
                META_NAMESPACE,
                Some("true".to_string()),
                IndexMap::new(),
                false,
            );
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_start_requires_master_group() {
        let fx = Fixture::new();
        let engine = fx.engine("master_group: gEos\nscene_item_suffix: _Scene\n");
        assert!(matches!(
            engine.start().await,
            Err(EngineError::MasterGroupMissing { .. })
        ));

        fx.items.add(Item::new(name("gEos"), ItemType::Switch));
        assert!(matches!(
            engine.start().await,
            Err(EngineError::MasterGroupNotAGroup { .. })
        ));
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_start_requires_master_scene_item() {
        let fx = Fixture::new();
        fx.items.add(Item::new(name("gEos"), ItemType::Group));
        let engine = fx.engine("master_group: gEos\nscene_item_suffix: _Scene\n");
        assert!(matches!(
            engine.start().await,
            Err(EngineError::MasterGroupNoSceneItem { .. })
        ));
    }

    #[tokio::test]
    async fn test_scene_command_drives_lights() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_light("Kitchen_Light", "gEos", ItemType::Dimmer);

        let engine = fx.engine("master_group: gEos\nscene_item_suffix: _Scene\n");
        engine.start().await.unwrap();
        assert!(engine.is_running());

        fx.items.send_command(&name("gEos_Scene"), "on");
        settle().await;
        assert_eq!(
            fx.items.state_of(&name("Kitchen_Light")),
            Some(ItemState::value("100"))
        );

        fx.items.send_command(&name("gEos_Scene"), "off");
        settle().await;
        assert_eq!(
            fx.items.state_of(&name("Kitchen_Light")),
            Some(ItemState::value("0"))
        );

        engine.stop();
        settle().await;
        assert!(!engine.is_running());
    }

    #[tokio::test]
    async fn test_scene_command_cascades_to_subgroups() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_group("gKitchen", Some("gEos"));
        fx.add_light("Kitchen_Light", "gKitchen", ItemType::Dimmer);
        fx.items
            .post_update(&name("gKitchen_Scene"), ItemState::value("off"));

        let engine = fx.engine("master_group: gEos\nscene_item_suffix: _Scene\n");
        engine.start().await.unwrap();

        fx.items.send_command(&name("gEos_Scene"), "on");
        settle().await;

        // the subgroup was commanded to follow its parent, and the light
        // picked up the parent's scene through the chain
        assert_eq!(
            fx.items.state_of(&name("gKitchen_Scene")),
            Some(ItemState::value("parent"))
        );
        assert_eq!(
            fx.items.state_of(&name("Kitchen_Light")),
            Some(ItemState::value("100"))
        );
        engine.stop();
    }

    #[tokio::test]
    async fn test_manual_light_update_is_corrected() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_light("Kitchen_Light", "gEos", ItemType::Dimmer);
        fx.items
            .post_update(&name("gEos_Scene"), ItemState::value("on"));

        let engine = fx.engine("master_group: gEos\nscene_item_suffix: _Scene\n");
        engine.start().await.unwrap();
        settle().await;

        // someone pokes the light directly; the engine puts it back
        fx.items
            .post_update(&name("Kitchen_Light"), ItemState::value("13"));
        settle().await;
        assert_eq!(
            fx.items.state_of(&name("Kitchen_Light")),
            Some(ItemState::value("100"))
        );
        engine.stop();
    }

    #[tokio::test]
    async fn test_source_update_reevaluates() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_light("Porch_Light", "gEos", ItemType::Switch);
        fx.items.add(Item::new(name("Lux_Sensor"), ItemType::Number));
        fx.items
            .post_update(&name("Lux_Sensor"), ItemState::value("100"));
        fx.metadata.set(
            "Porch_Light",
            META_NAMESPACE,
            None,
            IndexMap::from([(
                "auto".to_string(),
                json!({
                    "level_source": "Lux_Sensor",
                    "level_threshold": 300,
                    "state_above": "OFF",
                    "state_below": "ON",
                }),
            )]),
            false,
        );
        fx.items
            .post_update(&name("gEos_Scene"), ItemState::value("auto"));

        let engine = fx.engine("master_group: gEos\nscene_item_suffix: _Scene\n");
        engine.start().await.unwrap();
        settle().await;
        assert_eq!(
            fx.items.state_of(&name("Porch_Light")),
            Some(ItemState::value("ON"))
        );

        // the sun comes up
        fx.items
            .post_update(&name("Lux_Sensor"), ItemState::value("500"));
        settle().await;
        assert_eq!(
            fx.items.state_of(&name("Porch_Light")),
            Some(ItemState::value("OFF"))
        );
        engine.stop();
    }

    #[tokio::test]
    async fn test_reload_item_rescans() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.items.add(Item::new(name("Eos_Reload"), ItemType::Switch));

        let engine = fx.engine(
            "master_group: gEos\nscene_item_suffix: _Scene\nreload_item: Eos_Reload\n",
        );
        engine.start().await.unwrap();
        settle().await;

        // a light added after startup is invisible until a reload
        fx.add_light("New_Light", "gEos", ItemType::Dimmer);
        fx.items
            .post_update(&name("gEos_Scene"), ItemState::value("on"));
        settle().await;
        assert_eq!(
            fx.items.state_of(&name("New_Light")),
            Some(ItemState::Null)
        );

        fx.items.send_command(&name("Eos_Reload"), "ON");
        settle().await;
        assert_eq!(
            fx.items.state_of(&name("New_Light")),
            Some(ItemState::value("100"))
        );
        engine.stop();
    }
}
