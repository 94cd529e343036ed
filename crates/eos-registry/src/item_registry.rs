//! Live item states with tri-state semantics and group membership

use dashmap::DashMap;
use eos_core::events::{ItemCommandData, ItemStateChangedData, ItemStateUpdatedData};
use eos_core::{ItemName, ItemState, ItemType};
use eos_event_bus::EventBus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A device, sensor, or group known to the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub name: ItemName,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub state: ItemState,
    /// Names of the groups this item is a direct member of
    #[serde(default)]
    pub group_names: Vec<ItemName>,
}

impl Item {
    /// Create an item with no state yet (NULL)
    pub fn new(name: ItemName, item_type: ItemType) -> Self {
        Self {
            name,
            item_type,
            label: None,
            state: ItemState::Null,
            group_names: Vec::new(),
        }
    }

    /// Builder-style group membership
    pub fn in_groups(mut self, groups: impl IntoIterator<Item = ItemName>) -> Self {
        self.group_names = groups.into_iter().collect();
        self
    }

    /// Builder-style initial state
    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }
}

/// The item registry tracks all items and their current states
///
/// State writes fire ITEM_STATE_UPDATED on every update and
/// ITEM_STATE_CHANGED only when the value actually changed, mirroring
/// the host's "received update" vs "changed" trigger semantics.
pub struct ItemRegistry {
    items: DashMap<String, Item>,
    bus: Arc<EventBus>,
}

impl ItemRegistry {
    /// Create a new registry publishing on the given bus
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            items: DashMap::new(),
            bus,
        }
    }

    /// Add or replace an item definition
    pub fn add(&self, item: Item) {
        trace!(item = %item.name, item_type = %item.item_type, "Adding item");
        self.items.insert(item.name.to_string(), item);
    }

    /// Remove an item, returning its last definition
    pub fn remove(&self, name: &ItemName) -> Option<Item> {
        self.items.remove(name.as_str()).map(|(_, item)| item)
    }

    /// Look up an item by name
    pub fn get(&self, name: &ItemName) -> Option<Item> {
        self.items.get(name.as_str()).map(|i| i.clone())
    }

    /// Look up an item by raw name string
    pub fn get_by_name(&self, name: &str) -> Option<Item> {
        self.items.get(name).map(|i| i.clone())
    }

    /// The current state of an item, or None if the item doesn't exist
    pub fn state_of(&self, name: &ItemName) -> Option<ItemState> {
        self.items.get(name.as_str()).map(|i| i.state.clone())
    }

    /// Post a state update to an item
    ///
    /// Fires ITEM_STATE_UPDATED always, and ITEM_STATE_CHANGED when the
    /// value differs from the previous state. Updates to unknown items
    /// are dropped with a warning, like the host's event bus does.
    pub fn post_update(&self, name: &ItemName, state: ItemState) {
        let Some(mut entry) = self.items.get_mut(name.as_str()) else {
            warn!(item = %name, "Dropping update for unknown item");
            return;
        };

        let old_state = entry.state.clone();
        let changed = old_state != state;
        entry.state = state.clone();
        drop(entry);

        debug!(item = %name, state = %state, changed, "Item state updated");

        self.bus.fire_typed(ItemStateUpdatedData {
            item: name.clone(),
            state: state.clone(),
        });
        if changed {
            self.bus.fire_typed(ItemStateChangedData {
                item: name.clone(),
                old_state: Some(old_state),
                new_state: state,
            });
        }
    }

    /// Send a command to an item
    ///
    /// Fires ITEM_COMMAND and then applies the command as a state
    /// update (the host's autoupdate behavior). Fire-and-forget: there
    /// is no delivery confirmation.
    pub fn send_command(&self, name: &ItemName, command: impl Into<String>) {
        let command = command.into();
        debug!(item = %name, command = %command, "Sending command");

        self.bus.fire_typed(ItemCommandData {
            item: name.clone(),
            command: command.clone(),
        });
        self.post_update(name, ItemState::value(command));
    }

    /// Direct members of a group
    pub fn members_of(&self, group: &ItemName) -> Vec<Item> {
        let mut members: Vec<Item> = self
            .items
            .iter()
            .filter(|i| i.group_names.contains(group))
            .map(|i| i.clone())
            .collect();
        members.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        members
    }

    /// The groups an item belongs to
    pub fn groups_of(&self, name: &ItemName) -> Vec<ItemName> {
        self.get(name)
            .map(|i| i.group_names)
            .unwrap_or_default()
    }

    /// Total number of items
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// All item names
    pub fn all_names(&self) -> Vec<String> {
        self.items.iter().map(|i| i.key().clone()).collect()
    }
}

/// Thread-safe wrapper for ItemRegistry
pub type SharedItemRegistry = Arc<ItemRegistry>;
