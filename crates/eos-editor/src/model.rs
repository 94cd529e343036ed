//! Item representations as returned by the host REST API

use eos_core::{ItemType, LightType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One metadata namespace as the REST API reports it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RestMetadata {
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub config: indexmap::IndexMap<String, serde_json::Value>,
}

/// An item as returned by `GET /rest/items/{name}`
///
/// Group items include their direct members when fetched; `metadata`
/// only holds the namespaces requested with `?metadata=`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestItem {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub group_names: Vec<String>,
    #[serde(default)]
    pub members: Vec<RestItem>,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub metadata: HashMap<String, RestMetadata>,
}

impl RestItem {
    pub fn is_group(&self) -> bool {
        ItemType::parse(&self.item_type) == Some(ItemType::Group)
    }

    /// The light type, if this item can be controlled as a light
    pub fn light_type(&self) -> Option<LightType> {
        ItemType::parse(&self.item_type).and_then(LightType::from_item_type)
    }

    pub fn eos_metadata(&self) -> Option<&RestMetadata> {
        self.metadata.get(eos_core::META_NAMESPACE)
    }

    /// Single-line rendering for menus: `Dimmer Kitchen_Light "Kitchen"`
    pub fn menu_label(&self) -> String {
        match &self.label {
            Some(label) => format!("{} {} \"{}\"", self.item_type, self.name, label),
            None => format!("{} {}", self.item_type, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_item_with_metadata() {
        let item: RestItem = serde_json::from_value(json!({
            "name": "Kitchen_Light",
            "type": "Dimmer",
            "label": "Kitchen",
            "state": "42",
            "groupNames": ["gKitchen"],
            "editable": true,
            "metadata": {
                "eos": {"value": "true", "config": {"on": {"state": 80}}}
            }
        }))
        .unwrap();

        assert_eq!(item.light_type(), Some(LightType::Dimmer));
        assert!(!item.is_group());
        assert_eq!(item.menu_label(), "Dimmer Kitchen_Light \"Kitchen\"");
        let meta = item.eos_metadata().unwrap();
        assert_eq!(meta.value, Some(json!("true")));
        assert_eq!(meta.config["on"]["state"], json!(80));
    }

    #[test]
    fn test_deserialize_group_with_members() {
        let item: RestItem = serde_json::from_value(json!({
            "name": "gEos",
            "type": "Group",
            "members": [
                {"name": "gEos_Scene", "type": "String"},
                {"name": "Hall_Light", "type": "Switch"}
            ]
        }))
        .unwrap();

        assert!(item.is_group());
        assert_eq!(item.members.len(), 2);
        assert_eq!(item.members[1].light_type(), Some(LightType::Switch));
    }
}
