//! Discovery of scene items, lights, and nested Eos groups

use eos_core::{ItemName, ItemType, LightType, SceneName, SettingValue, META_NAMESPACE, META_STRING_FALSE};
use eos_registry::{Item, ItemRegistry, MetadataRegistry};
use eos_scenes::SettingTree;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, warn};

use crate::config::EosConfig;

/// Parent-scene chains longer than this indicate a group cycle
const MAX_PARENT_DEPTH: usize = 16;

/// Read-only view over the registries for walking the Eos hierarchy
pub struct Discovery<'a> {
    items: &'a ItemRegistry,
    metadata: &'a MetadataRegistry,
    config: &'a EosConfig,
}

/// The discovered trigger surface of the Eos hierarchy
#[derive(Debug, Default)]
pub struct Topology {
    /// Scene item name to the group it controls
    pub scene_items: HashMap<String, ItemName>,
    /// Every enabled light item
    pub lights: HashSet<String>,
    /// Every `level_source` / `motion_source` item referenced anywhere
    pub sources: HashSet<String>,
}

impl<'a> Discovery<'a> {
    pub fn new(
        items: &'a ItemRegistry,
        metadata: &'a MetadataRegistry,
        config: &'a EosConfig,
    ) -> Self {
        Self {
            items,
            metadata,
            config,
        }
    }

    /// Whether Eos is disabled for this item via its metadata value
    pub fn is_disabled(&self, name: &str) -> bool {
        match self.metadata.get_value(name, META_NAMESPACE) {
            Some(value) => META_STRING_FALSE.contains(&value.trim().to_lowercase().as_str()),
            None => false,
        }
    }

    /// The `eos` configuration tree of an item
    pub fn config_tree(&self, name: &str) -> SettingTree {
        self.metadata.get_config(name, META_NAMESPACE).into_iter().collect()
    }

    /// Find the scene item of a group
    ///
    /// Exactly one member must match the configured name affixes and it
    /// must be a String item; anything else logs and yields None.
    pub fn scene_item(&self, group: &ItemName) -> Option<Item> {
        let matches: Vec<Item> = self
            .items
            .members_of(group)
            .into_iter()
            .filter(|i| self.config.is_scene_item_name(i.name.as_str()))
            .collect();

        match matches.as_slice() {
            [] => {
                debug!(group = %group, "Group does not contain a scene item");
                None
            }
            [item] if item.item_type == ItemType::String => Some(item.clone()),
            [item] => {
                error!(group = %group, item = %item.name, "Scene item is not a String item");
                None
            }
            many => {
                let names: Vec<&str> = many.iter().map(|i| i.name.as_str()).collect();
                error!(group = %group, scene_items = ?names, "Group contains more than one scene item, each group can only have one");
                None
            }
        }
    }

    /// All Eos light items directly in a group
    ///
    /// A light must carry `eos` metadata with a non-null value to be
    /// discovered, and must not be disabled.
    pub fn light_items(&self, group: &ItemName) -> Vec<Item> {
        self.items
            .members_of(group)
            .into_iter()
            .filter(|i| {
                i.item_type != ItemType::Group
                    && LightType::from_item_type(i.item_type).is_some()
                    && !self.config.is_scene_item_name(i.name.as_str())
                    && self.has_eos_metadata(i.name.as_str())
            })
            .collect()
    }

    /// Nested Eos groups directly in a group (those with a scene item)
    pub fn group_items(&self, group: &ItemName) -> Vec<Item> {
        self.items
            .members_of(group)
            .into_iter()
            .filter(|i| i.item_type == ItemType::Group && self.scene_item(&i.name).is_some())
            .collect()
    }

    /// The unique Eos group an item belongs to
    ///
    /// An item may be in many groups; exactly one of them must contain
    /// a scene item.
    pub fn eos_group_of(&self, name: &ItemName) -> Option<Item> {
        let groups: Vec<ItemName> = self
            .items
            .groups_of(name)
            .into_iter()
            .filter(|g| self.scene_item(g).is_some())
            .collect();

        match groups.as_slice() {
            [] => {
                error!(item = %name, "No Eos group found for item");
                None
            }
            [group] => self.items.get(group),
            many => {
                let names: Vec<&str> = many.iter().map(|g| g.as_str()).collect();
                error!(item = %name, groups = ?names, "Item is a member of more than one Eos group, each item can only be in one");
                None
            }
        }
    }

    /// The scene currently applicable to an item
    ///
    /// Follows `parent` scenes up the group hierarchy. The master group
    /// has no parent; a master scene of `parent` is an impossible state
    /// caused by bad site configuration and resolves to `off`.
    pub fn scene_for_item(&self, item: &Item) -> Option<SceneName> {
        self.scene_for_item_at(item, 0)
    }

    fn scene_for_item_at(&self, item: &Item, depth: usize) -> Option<SceneName> {
        if depth > MAX_PARENT_DEPTH {
            error!(item = %item.name, "Parent scene chain too deep, the group hierarchy contains a cycle");
            return None;
        }

        let group = self.eos_group_of(&item.name)?;
        let scene_item = self.scene_item(&group.name)?;
        let scene = SceneName::new(scene_item.state.to_string());

        if scene.is_parent() {
            if group.name.as_str() == self.config.master_group {
                error!(
                    group = %group.name, scene_item = %scene_item.name,
                    "Master group scene is set to 'parent', an impossible state; using '{}' instead",
                    SceneName::OFF
                );
                return Some(SceneName::off());
            }
            // the group inherits its scene from the group above it
            return self.scene_for_item_at(&group, depth + 1);
        }
        Some(scene)
    }

    /// Whether a group follows its parent's scene changes (default yes)
    pub fn follows_parent(&self, group: &ItemName) -> bool {
        let config = self.metadata.get_config(group.as_str(), META_NAMESPACE);
        match config.get(eos_core::META_KEY_FOLLOW_PARENT) {
            None => true,
            Some(raw) => match SettingValue::parse(raw) {
                None => true,
                Some(SettingValue::Bool(b)) => b,
                Some(SettingValue::Number(n)) => n != 0.0,
                Some(SettingValue::Text(t)) => !t.is_empty(),
                Some(SettingValue::List(l)) => !l.is_empty(),
            },
        }
    }

    /// Walk the hierarchy from the master group and collect every item
    /// the engine must react to
    pub fn scan(&self) -> Topology {
        let mut topology = Topology::default();
        collect_sources_tree(&self.config.global_settings(), &mut topology.sources);

        let Ok(master) = ItemName::new(self.config.master_group.clone()) else {
            error!(group = %self.config.master_group, "Master group is not a valid item name");
            return topology;
        };
        let mut visited = HashSet::new();
        self.scan_group(&master, &mut topology, &mut visited);
        debug!(
            scene_items = topology.scene_items.len(),
            lights = topology.lights.len(),
            sources = topology.sources.len(),
            "Discovery scan complete"
        );
        topology
    }

    fn scan_group(&self, group: &ItemName, topology: &mut Topology, visited: &mut HashSet<String>) {
        if !visited.insert(group.to_string()) {
            warn!(group = %group, "Group hierarchy contains a cycle, skipping repeat visit");
            return;
        }
        if self.is_disabled(group.as_str()) {
            debug!(group = %group, "Found group but it is disabled");
            return;
        }

        let Some(scene_item) = self.scene_item(group) else {
            warn!(group = %group, "No lights or groups in group will be discovered because it has no scene item");
            return;
        };
        topology
            .scene_items
            .insert(scene_item.name.to_string(), group.clone());
        collect_sources_tree(&self.config_tree(group.as_str()), &mut topology.sources);

        for light in self.light_items(group) {
            if self.is_disabled(light.name.as_str()) {
                debug!(light = %light.name, group = %group, "Found light but it is disabled");
                continue;
            }
            collect_sources_tree(&self.config_tree(light.name.as_str()), &mut topology.sources);
            topology.lights.insert(light.name.to_string());
        }

        for nested in self.group_items(group) {
            self.scan_group(&nested.name, topology, visited);
        }
    }

    fn has_eos_metadata(&self, name: &str) -> bool {
        self.metadata
            .get_value(name, META_NAMESPACE)
            .as_deref()
            .and_then(SettingValue::parse_str)
            .is_some()
    }
}

fn collect_sources_tree(tree: &SettingTree, out: &mut HashSet<String>) {
    out.extend(tree.level_sources());
    out.extend(tree.motion_sources());
}

#[cfg(test)]
mod tests {
    use super::*;
    use eos_core::ItemState;
    use eos_event_bus::EventBus;
    use indexmap::IndexMap;
    use serde_json::json;
    use std::sync::Arc;

    fn name(s: &str) -> ItemName {
        ItemName::new(s).unwrap()
    }

    struct Fixture {
        items: ItemRegistry,
        metadata: MetadataRegistry,
        config: EosConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let config = EosConfig::from_yaml(
                "master_group: gEos\nscene_item_suffix: _Scene\n",
            )
            .unwrap();
            Self {
                items: ItemRegistry::new(Arc::new(EventBus::new())),
                metadata: MetadataRegistry::new(),
                config,
            }
        }

        fn discovery(&self) -> Discovery<'_> {
            Discovery::new(&self.items, &self.metadata, &self.config)
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

        fn set_scene(&self, group: &str, scene: &str) {
            self.items
                .post_update(&name(&format!("{group}_Scene")), ItemState::value(scene));
        }
    }

    #[test]
    fn test_scene_item_lookup() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        let d = fx.discovery();

        assert_eq!(
            d.scene_item(&name("gEos")).unwrap().name,
            name("gEos_Scene")
        );
        // a second matching member spoils the lookup
        fx.items.add(
            Item::new(name("gEos_Other_Scene"), ItemType::String).in_groups([name("gEos")]),
        );
        assert!(d.scene_item(&name("gEos")).is_none());
    }

    #[test]
    fn test_scene_item_must_be_string() {
        let fx = Fixture::new();
        fx.items.add(Item::new(name("gEos"), ItemType::Group));
        fx.items
            .add(Item::new(name("gEos_Scene"), ItemType::Number).in_groups([name("gEos")]));
        assert!(fx.discovery().scene_item(&name("gEos")).is_none());
    }

    #[test]
    fn test_light_discovery_requires_metadata() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_light("Kitchen_Light", "gEos", ItemType::Dimmer);
        // a member without eos metadata is not an Eos light
        fx.items
            .add(Item::new(name("Plain_Light"), ItemType::Dimmer).in_groups([name("gEos")]));

        let lights = fx.discovery().light_items(&name("gEos"));
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].name, name("Kitchen_Light"));
    }

    #[test]
    fn test_parent_scene_inheritance() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_group("gPorch", Some("gEos"));
        fx.add_light("Porch_Light", "gPorch", ItemType::Switch);
        fx.set_scene("gEos", "evening");
        fx.set_scene("gPorch", "parent");

        let d = fx.discovery();
        let light = fx.items.get(&name("Porch_Light")).unwrap();
        assert_eq!(d.scene_for_item(&light), Some(SceneName::new("evening")));
    }

    #[test]
    fn test_master_parent_scene_resolves_off() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_light("Hall_Light", "gEos", ItemType::Switch);
        fx.set_scene("gEos", "parent");

        let light = fx.items.get(&name("Hall_Light")).unwrap();
        assert_eq!(
            fx.discovery().scene_for_item(&light),
            Some(SceneName::off())
        );
    }

    #[test]
    fn test_disabled_item() {
        let fx = Fixture::new();
        fx.metadata.set(
            "Kitchen_Light",
            META_NAMESPACE,
            Some("DISABLED".to_string()),
            IndexMap::new(),
            false,
        );
        assert!(fx.discovery().is_disabled("Kitchen_Light"));
        assert!(!fx.discovery().is_disabled("Other_Light"));
    }

    #[test]
    fn test_follows_parent_default_and_override() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        let d = fx.discovery();
        assert!(d.follows_parent(&name("gEos")));

        fx.metadata.set(
            "gEos",
            META_NAMESPACE,
            None,
            IndexMap::from([("follow_parent".to_string(), json!(false))]),
            false,
        );
        assert!(!fx.discovery().follows_parent(&name("gEos")));
    }

    #[test]
    fn test_scan_topology() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_group("gKitchen", Some("gEos"));
        fx.add_light("Kitchen_Light", "gKitchen", ItemType::Dimmer);
        fx.metadata.set(
            "Kitchen_Light",
            META_NAMESPACE,
            Some("true".to_string()),
            IndexMap::from([(
                "evening".to_string(),
                json!({"level_source": "Lux_Sensor", "motion_source": "Hall_Motion"}),
            )]),
            false,
        );

        let topology = fx.discovery().scan();
        assert_eq!(topology.scene_items.get("gEos_Scene"), Some(&name("gEos")));
        assert_eq!(
            topology.scene_items.get("gKitchen_Scene"),
            Some(&name("gKitchen"))
        );
        assert!(topology.lights.contains("Kitchen_Light"));
        assert!(topology.sources.contains("Lux_Sensor"));
        assert!(topology.sources.contains("Hall_Motion"));
    }

    #[test]
    fn test_scan_skips_disabled_group() {
        let fx = Fixture::new();
        fx.add_group("gEos", None);
        fx.add_group("gGarage", Some("gEos"));
        fx.add_light("Garage_Light", "gGarage", ItemType::Switch);
        fx.metadata.set(
            "gGarage",
            META_NAMESPACE,
            Some("false".to_string()),
            IndexMap::new(),
            false,
        );

        let topology = fx.discovery().scan();
        assert!(!topology.lights.contains("Garage_Light"));
        assert!(!topology.scene_items.contains_key("gGarage_Scene"));
    }
}
