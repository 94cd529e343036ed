//! Interactive menus for browsing groups and editing light metadata

use anyhow::{bail, Result};
use eos_core::{SceneName, SceneType, META_STRING_FALSE};
use eos_scenes::{global_defaults, scene_type, SettingTree, SettingsSnapshot};
use indexmap::IndexMap;
use inquire::{Confirm, InquireError, Select, Text};
use serde_json::Value;
use std::fmt;

use crate::model::RestItem;
use crate::rest::RestClient;

struct Entry {
    label: String,
    action: Action,
}

#[derive(Clone)]
enum Action {
    OpenLight(String),
    OpenGroup(String),
    ToggleEnabled,
    EditSetting(String),
    EditScene(String),
    AddSetting,
    AddScene,
    DeleteScene,
    Save,
    Back,
}

impl Entry {
    fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Prompt with a list of entries; Esc and Ctrl-C read as "back"
fn prompt(message: &str, entries: Vec<Entry>) -> Result<Action> {
    match Select::new(message, entries).prompt() {
        Ok(entry) => Ok(entry.action),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            Ok(Action::Back)
        }
        Err(e) => Err(e.into()),
    }
}

/// Browse a group: its lights, nested groups, and non-Eos members
pub fn browse_group(client: &RestClient, group_name: &str) -> Result<()> {
    loop {
        let Some(group) = client.get_item(group_name)? else {
            bail!("group '{group_name}' does not exist");
        };

        let mut entries = Vec::new();
        for member in &group.members {
            if member.is_group() {
                entries.push(Entry::new(
                    member.menu_label(),
                    Action::OpenGroup(member.name.clone()),
                ));
            } else if member.light_type().is_some() {
                let tag = if member.eos_metadata().is_some() {
                    ""
                } else {
                    "  (not in Eos)"
                };
                entries.push(Entry::new(
                    format!("{}{}", member.menu_label(), tag),
                    Action::OpenLight(member.name.clone()),
                ));
            }
        }
        entries.push(Entry::new("Back", Action::Back));

        let message = format!("Eos Editor > {}", group.menu_label());
        match prompt(&message, entries)? {
            Action::OpenLight(name) => edit_light(client, &name)?,
            Action::OpenGroup(name) => browse_group(client, &name)?,
            _ => return Ok(()),
        }
    }
}

/// Edit one light's Eos metadata, writing back only on Save
pub fn edit_light(client: &RestClient, name: &str) -> Result<()> {
    let Some(item) = client.get_item(name)? else {
        bail!("item '{name}' does not exist");
    };

    let metadata = item.eos_metadata().cloned().unwrap_or_default();
    let mut enabled = is_enabled(metadata.value.as_ref());
    let mut config = metadata.config;

    loop {
        let mut entries = Vec::new();
        entries.push(Entry::new(
            format!("Enabled          {enabled}"),
            Action::ToggleEnabled,
        ));

        for (key, value) in config.iter().filter(|(_, v)| !v.is_object()) {
            entries.push(Entry::new(
                format!("{key:17}{}", render_value(value)),
                Action::EditSetting(key.clone()),
            ));
        }
        entries.push(Entry::new("Add setting", Action::AddSetting));

        for key in config
            .iter()
            .filter(|(_, v)| v.is_object())
            .map(|(k, _)| k.clone())
        {
            let preview = scene_preview(&item, &config, &key);
            entries.push(Entry::new(
                format!("{key:17}{preview}"),
                Action::EditScene(key.clone()),
            ));
        }
        for builtin in [SceneName::ON, SceneName::OFF] {
            if !config.contains_key(builtin) {
                let preview = scene_preview(&item, &config, builtin);
                entries.push(Entry::new(
                    format!("{builtin} (built-in)  {preview}"),
                    Action::EditScene(builtin.to_string()),
                ));
            }
        }
        entries.push(Entry::new("Add scene", Action::AddScene));
        entries.push(Entry::new("Save", Action::Save));
        entries.push(Entry::new("Cancel", Action::Back));

        let message = format!("Eos Editor > {}", item.menu_label());
        match prompt(&message, entries)? {
            Action::ToggleEnabled => enabled = !enabled,
            Action::EditSetting(key) => {
                let current = config.get(&key).cloned();
                match prompt_value(&key, current.as_ref())? {
                    Some(value) => {
                        config.insert(key, value);
                    }
                    None => {
                        config.shift_remove(&key);
                    }
                }
            }
            Action::AddSetting => {
                if let Some(key) = prompt_name("Setting name")? {
                    if let Some(value) = prompt_value(&key, None)? {
                        config.insert(key, value);
                    }
                }
            }
            Action::EditScene(scene) => edit_scene(&item, &mut config, &scene)?,
            Action::AddScene => {
                if let Some(scene) = prompt_name("Scene name")? {
                    config
                        .entry(scene.clone())
                        .or_insert_with(|| Value::Object(Default::default()));
                    edit_scene(&item, &mut config, &scene)?;
                }
            }
            Action::Save => {
                let value = if enabled { "true" } else { "false" };
                client.put_metadata(name, Some(value), &config)?;
                println!("Saved '{name}'");
                return Ok(());
            }
            _ => return Ok(()),
        }
    }
}

/// Edit one scene's settings within the working copy of the config
fn edit_scene(
    item: &RestItem,
    config: &mut IndexMap<String, Value>,
    scene: &str,
) -> Result<()> {
    loop {
        let settings = config
            .get(scene)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut entries = Vec::new();
        for (key, value) in &settings {
            entries.push(Entry::new(
                format!("{key:17}{}", render_value(value)),
                Action::EditSetting(key.clone()),
            ));
        }
        entries.push(Entry::new("Add setting", Action::AddSetting));
        if config.contains_key(scene) {
            entries.push(Entry::new("Delete scene", Action::DeleteScene));
        }
        entries.push(Entry::new("Back", Action::Back));

        let message = format!(
            "Eos Editor > {} > {} ({})",
            item.name,
            scene,
            scene_preview(item, config, scene)
        );
        match prompt(&message, entries)? {
            Action::EditSetting(key) => {
                let mut settings = settings.clone();
                match prompt_value(&key, settings.get(&key))? {
                    Some(value) => {
                        settings.insert(key, value);
                    }
                    None => {
                        settings.remove(&key);
                    }
                }
                config.insert(scene.to_string(), Value::Object(settings));
            }
            Action::AddSetting => {
                if let Some(key) = prompt_name("Setting name")? {
                    if let Some(value) = prompt_value(&key, None)? {
                        let mut settings = settings.clone();
                        settings.insert(key, value);
                        config.insert(scene.to_string(), Value::Object(settings));
                    }
                }
            }
            Action::DeleteScene => {
                let confirmed = Confirm::new(&format!("Delete scene '{scene}'?"))
                    .with_default(false)
                    .prompt()
                    .unwrap_or(false);
                if confirmed {
                    config.shift_remove(scene);
                    return Ok(());
                }
            }
            _ => return Ok(()),
        }
    }
}

/// How the resolver would classify this scene for this light
fn scene_preview(item: &RestItem, config: &IndexMap<String, Value>, scene: &str) -> String {
    let Some(light_type) = item.light_type() else {
        return "-".to_string();
    };
    let snapshot = SettingsSnapshot::new(
        config.clone().into_iter().collect(),
        SettingTree::new(),
        global_defaults(),
    );
    match scene_type(&snapshot, &SceneName::new(scene), light_type) {
        Some(SceneType::Fixed) => "Fixed".to_string(),
        Some(SceneType::Threshold) => "Threshold".to_string(),
        Some(SceneType::Scaled) => "Scaled".to_string(),
        None => "Unknown".to_string(),
    }
}

fn is_enabled(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            !META_STRING_FALSE.contains(&s.trim().to_lowercase().as_str())
        }
        Some(_) => true,
        None => false,
    }
}

/// Render a setting value the way it will appear in metadata
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}

fn prompt_name(message: &str) -> Result<Option<String>> {
    match Text::new(message).prompt() {
        Ok(name) if name.trim().is_empty() => Ok(None),
        Ok(name) => Ok(Some(name.trim().to_string())),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Prompt for a setting value; blank removes, Esc keeps the current one
///
/// Input parses as JSON where possible so numbers and booleans keep
/// their types; anything else is stored as a string.
fn prompt_value(key: &str, current: Option<&Value>) -> Result<Option<Value>> {
    let initial = match current {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    match Text::new(&format!("Value for '{key}' (blank to remove)"))
        .with_initial_value(&initial)
        .prompt()
    {
        Ok(input) if input.trim().is_empty() => Ok(None),
        Ok(input) => Ok(Some(
            serde_json::from_str(&input).unwrap_or(Value::String(input)),
        )),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
            Ok(current.cloned())
        }
        Err(e) => Err(e.into()),
    }
}
