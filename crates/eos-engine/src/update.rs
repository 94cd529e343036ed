//! Light and group update processing

use eos_core::{ItemName, ItemState, LightType, SceneName};
use eos_registry::{Item, SharedItemRegistry, SharedMetadataRegistry};
use eos_scenes::{state_for_scene, ItemStates, SettingTree, SettingsSnapshot};
use tracing::{debug, error, trace};

use crate::config::EosConfig;
use crate::discovery::Discovery;

/// Commands that would change the numeric state by less than this are
/// suppressed
const FLOAT_TOLERANCE: f64 = 1e-3;

/// Applies scenes to lights and groups
///
/// All methods are synchronous and log-only on failure; a light whose
/// configuration cannot be evaluated is left untouched.
pub struct Updater {
    items: SharedItemRegistry,
    metadata: SharedMetadataRegistry,
    config: EosConfig,
    global: SettingTree,
}

impl Updater {
    pub fn new(
        items: SharedItemRegistry,
        metadata: SharedMetadataRegistry,
        config: EosConfig,
    ) -> Self {
        let global = config.global_settings();
        Self {
            items,
            metadata,
            config,
            global,
        }
    }

    pub fn config(&self) -> &EosConfig {
        &self.config
    }

    fn discovery(&self) -> Discovery<'_> {
        Discovery::new(&self.items, &self.metadata, &self.config)
    }

    /// Rediscover the trigger surface of the hierarchy
    pub fn scan(&self) -> crate::discovery::Topology {
        self.discovery().scan()
    }

    /// Look up the scene item of a group, if it has one
    pub fn scene_item_of(&self, group: &ItemName) -> Option<Item> {
        self.discovery().scene_item(group)
    }

    /// Update every Eos controlled light, starting at the master group
    pub fn update_all(&self) {
        let Ok(master) = ItemName::new(self.config.master_group.clone()) else {
            error!(group = %self.config.master_group, "Master group is not a valid item name");
            return;
        };
        let Some(master) = self.items.get(&master) else {
            error!(group = %self.config.master_group, "Master group item does not exist");
            return;
        };
        self.update_group(&master, false);
    }

    /// Send a command to one light based on its current scene
    pub fn update_light(&self, item: &Item) {
        let discovery = self.discovery();
        if discovery.is_disabled(item.name.as_str()) {
            debug!(light = %item.name, "Skipping update for disabled light");
            return;
        }
        debug!(light = %item.name, "Processing update for light");

        let Some(scene) = discovery.scene_for_item(item) else {
            return;
        };
        if self.config.log_trace {
            trace!(light = %item.name, scene = %scene, "Resolved scene for light");
        }
        if scene.is_manual() {
            debug!(light = %item.name, scene = %scene, "Scene is manual, no action taken");
            return;
        }

        let Some(light_type) = LightType::from_item_type(item.item_type) else {
            error!(light = %item.name, item_type = %item.item_type, "Couldn't get light type for item");
            return;
        };

        let snapshot = self.snapshot_for(&discovery, item);
        let new_state = state_for_scene(
            &snapshot,
            &scene,
            &item.name,
            light_type,
            &item.state,
            &RegistryStates(&self.items),
        );
        self.send_command_if_changed(&item.name, &item.state, new_state);
    }

    /// Update all lights in a group and recurse into nested groups
    ///
    /// With `only_if_scene_parent`, a group whose scene is not `parent`
    /// is skipped entirely (it holds its own scene).
    pub fn update_group(&self, group: &Item, only_if_scene_parent: bool) {
        let discovery = self.discovery();
        if discovery.is_disabled(group.name.as_str()) {
            debug!(group = %group.name, "Skipping update for disabled group");
            return;
        }
        debug!(group = %group.name, "Processing update for group");

        if only_if_scene_parent {
            let holds_own_scene = discovery
                .scene_item(&group.name)
                .map(|scene_item| {
                    !SceneName::new(scene_item.state.to_string()).is_parent()
                })
                .unwrap_or(true);
            if holds_own_scene {
                return;
            }
        }

        for light in discovery.light_items(&group.name) {
            self.update_light(&light);
        }
        for nested in discovery.group_items(&group.name) {
            self.update_group(&nested, only_if_scene_parent);
        }
    }

    /// React to a scene change on a group's scene item
    ///
    /// Lights in the group are updated; nested groups are commanded to
    /// the `parent` scene (so their own scene rules cascade) unless
    /// they opt out of following, in which case only their
    /// `parent`-scened descendants are refreshed.
    pub fn update_scene(&self, group: &Item) {
        let discovery = self.discovery();
        for light in discovery.light_items(&group.name) {
            self.update_light(&light);
        }

        for nested in discovery.group_items(&group.name) {
            if discovery.is_disabled(nested.name.as_str()) {
                continue;
            }
            if discovery.follows_parent(&nested.name) {
                if let Some(scene_item) = discovery.scene_item(&nested.name) {
                    debug!(group = %nested.name, parent = %group.name, "Setting group to follow parent scene");
                    self.items.send_command(&scene_item.name, SceneName::PARENT);
                }
            } else {
                self.update_group(&nested, true);
            }
        }
    }

    fn snapshot_for(&self, discovery: &Discovery<'_>, item: &Item) -> SettingsSnapshot {
        let item_tree = discovery.config_tree(item.name.as_str());
        let group_tree = discovery
            .eos_group_of(&item.name)
            .map(|g| discovery.config_tree(g.name.as_str()))
            .unwrap_or_default();
        SettingsSnapshot::new(item_tree, group_tree, self.global.clone())
    }

    /// Send the command only when it would actually change the state
    ///
    /// Numeric states compare with a small tolerance so dimmer rounding
    /// does not cause command loops.
    fn send_command_if_changed(&self, name: &ItemName, current: &ItemState, command: String) {
        if state_matches(current, &command) {
            debug!(light = %name, command = %command, "No command sent, state already matches");
            return;
        }
        debug!(light = %name, command = %command, "Sending command to light");
        self.items.send_command(name, command);
    }
}

fn state_matches(current: &ItemState, command: &str) -> bool {
    match current {
        ItemState::Value(value) => match (value.parse::<f64>(), command.parse::<f64>()) {
            (Ok(a), Ok(b)) => (a - b).abs() < FLOAT_TOLERANCE,
            _ => value == command,
        },
        _ => false,
    }
}

/// Live item state lookup backed by the item registry
struct RegistryStates<'a>(&'a SharedItemRegistry);

impl ItemStates for RegistryStates<'_> {
    fn state_of(&self, name: &str) -> Option<ItemState> {
        self.0.get_by_name(name).map(|i| i.state)
    }
}
