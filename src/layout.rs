//! Dock layout persistence
//!
//! The `layout` document wraps the panel tree consumed by the UI layout
//! renderer. The tree is kept as the JSON object the renderer produced; this
//! module only reads and touches the few keys it needs to keep a tab closable.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::app_state::LIBRARY_FOLDER_ID;
use crate::debounce::{Debouncer, DEFAULT_WINDOW};
use crate::document::{self, DocumentStore, Revision};
use crate::error::StoreError;

pub const LAYOUT_ID: &str = "layout";

const CONFIG_FIELD: &str = "config";
const DATA_TYPE_FIELD: &str = "dataType";

const SETTINGS: &str = "settings";
const SHOW_CLOSE_ICON: &str = "showCloseIcon";
const ROOT: &str = "root";
const CONTENT: &str = "content";
const TYPE: &str = "type";
const COMPONENT_TYPE: &str = "componentType";
const IS_CLOSABLE: &str = "isClosable";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,
    #[serde(default = "layout_data_type")]
    pub data_type: String,
    pub config: LayoutConfig,
}

/// Renderer-owned layout tree. Any JSON object is accepted and written back
/// unchanged apart from [`normalize_layout`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutConfig(Map<String, Value>);

impl LayoutConfig {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn show_close_icon(&self) -> Option<bool> {
        self.0
            .get(SETTINGS)
            .and_then(|settings| settings.get(SHOW_CLOSE_ICON))
            .and_then(Value::as_bool)
    }

    pub fn root(&self) -> Option<&Value> {
        self.0.get(ROOT)
    }

    /// All component leaves of the tree, depth first.
    pub fn components(&self) -> Vec<&Value> {
        let mut found = Vec::new();
        if let Some(root) = self.root() {
            collect_components(root, &mut found);
        }
        found
    }

    /// Whether the close icon is shown and some component can be closed.
    pub fn has_closable_panel(&self) -> bool {
        self.show_close_icon() == Some(true)
            && self.components().into_iter().any(is_closable)
    }
}

impl From<LayoutConfig> for Value {
    fn from(config: LayoutConfig) -> Self {
        Value::Object(config.0)
    }
}

fn is_component(item: &Value) -> bool {
    item.get(TYPE).and_then(Value::as_str) == Some("component")
        || item.get(COMPONENT_TYPE).is_some()
}

/// Items are closable unless they explicitly opt out.
fn is_closable(item: &Value) -> bool {
    item.get(IS_CLOSABLE) != Some(&Value::Bool(false))
}

fn collect_components<'a>(item: &'a Value, found: &mut Vec<&'a Value>) {
    if is_component(item) {
        found.push(item);
        return;
    }
    if let Some(children) = item.get(CONTENT).and_then(Value::as_array) {
        for child in children {
            collect_components(child, found);
        }
    }
}

fn collect_components_mut<'a>(item: &'a mut Value, found: &mut Vec<&'a mut Value>) {
    if is_component(item) {
        found.push(item);
        return;
    }
    if let Some(children) = item.get_mut(CONTENT).and_then(Value::as_array_mut) {
        for child in children {
            collect_components_mut(child, found);
        }
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            id: LAYOUT_ID.into(),
            rev: None,
            data_type: layout_data_type(),
            config: default_config(),
        }
    }
}

fn layout_data_type() -> String {
    LAYOUT_ID.into()
}

fn default_config() -> LayoutConfig {
    let config = json!({
        "settings": {
            "showPopoutIcon": false,
            "showMaximiseIcon": false,
            "showCloseIcon": true
        },
        "dimensions": {
            "borderWidth": 3,
            "headerHeight": 36
        },
        "root": {
            "type": "stack",
            "content": [{
                "type": "component",
                "title": "Library",
                "componentType": "LibraryPage",
                "componentState": { "id": LIBRARY_FOLDER_ID }
            }]
        }
    });
    match config {
        Value::Object(fields) => LayoutConfig(fields),
        _ => LayoutConfig::default(),
    }
}

/// Keep the last tab closable: force the close icon on, and if every component
/// opted out of closing, drop the first one's override. Nothing else changes.
pub fn normalize_layout(config: &mut LayoutConfig) {
    let settings = config
        .0
        .entry(SETTINGS)
        .or_insert_with(|| Value::Object(Map::new()));
    if !settings.is_object() {
        *settings = Value::Object(Map::new());
    }
    if let Some(settings) = settings.as_object_mut() {
        settings.insert(SHOW_CLOSE_ICON.to_string(), Value::Bool(true));
    }

    if let Some(root) = config.0.get_mut(ROOT) {
        let mut components = Vec::new();
        collect_components_mut(root, &mut components);
        if !components.is_empty() && components.iter().all(|item| !is_closable(item)) {
            if let Some(first) = components[0].as_object_mut() {
                first.remove(IS_CLOSABLE);
            }
        }
    }
}

/// Owner of the `layout` document.
pub struct LayoutStore<S> {
    store: Arc<S>,
    debouncer: Debouncer<LayoutConfig>,
}

impl<S: DocumentStore> LayoutStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_window(store, DEFAULT_WINDOW)
    }

    pub fn with_window(store: Arc<S>, window: Duration) -> Self {
        Self {
            store,
            debouncer: Debouncer::new(window),
        }
    }

    /// Load the stored layout, creating and persisting the default when absent.
    /// The returned config is always normalized.
    ///
    /// A document without an object `config` yields an unsaved default; the
    /// next update replaces the stored `config` with whatever the caller sends.
    pub async fn get_layout(&self) -> Result<LayoutState, StoreError> {
        match document::fetch::<S, LayoutState>(self.store.as_ref(), LAYOUT_ID).await {
            Ok(mut layout) => {
                normalize_layout(&mut layout.config);
                Ok(layout)
            }
            Err(error) if error.is_not_found() => {
                let mut layout = LayoutState::default();
                layout.rev = Some(document::save(self.store.as_ref(), &layout).await?);
                log::debug!("Created default layout");
                Ok(layout)
            }
            Err(error) => {
                log::warn!("Unable to read layout, using defaults: {error}");
                Ok(LayoutState::default())
            }
        }
    }

    /// Schedule a write of `config` into the layout document. Calls within the
    /// debounce window collapse into one write of the latest config.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn update_layout(&self, config: LayoutConfig) {
        let store = Arc::clone(&self.store);
        self.debouncer.call(config, move |config| async move {
            if let Err(error) = persist_layout(store.as_ref(), config).await {
                log::warn!("Failed to save layout: {error}");
            }
        });
    }

    /// Replace the stored config immediately, keeping the document's other fields.
    pub async fn write_layout(&self, config: LayoutConfig) -> Result<LayoutState, StoreError> {
        persist_layout(self.store.as_ref(), config).await
    }

    pub fn debounce_window(&self) -> Duration {
        self.debouncer.window()
    }
}

async fn persist_layout<S: DocumentStore>(
    store: &S,
    mut config: LayoutConfig,
) -> Result<LayoutState, StoreError> {
    normalize_layout(&mut config);

    let mut doc = match store.get(LAYOUT_ID).await {
        Ok(doc) => doc,
        Err(error) if error.is_not_found() => serde_json::to_value(LayoutState::default())?,
        Err(error) => return Err(error),
    };
    let object = doc
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidDocument("stored layout is not an object".into()))?;
    object.insert(CONFIG_FIELD.to_string(), Value::from(config.clone()));
    let data_type = object
        .get(DATA_TYPE_FIELD)
        .and_then(Value::as_str)
        .map_or_else(layout_data_type, str::to_string);

    let rev = store.put(doc).await?;
    log::debug!("Saved layout at revision {rev}");
    Ok(LayoutState {
        id: LAYOUT_ID.into(),
        rev: Some(rev),
        data_type,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(value: Value) -> LayoutConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_default_document_shape() {
        let value = serde_json::to_value(LayoutState::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "_id": "layout",
                "dataType": "layout",
                "config": {
                    "settings": {
                        "showPopoutIcon": false,
                        "showMaximiseIcon": false,
                        "showCloseIcon": true
                    },
                    "dimensions": {
                        "borderWidth": 3,
                        "headerHeight": 36
                    },
                    "root": {
                        "type": "stack",
                        "content": [{
                            "type": "component",
                            "title": "Library",
                            "componentType": "LibraryPage",
                            "componentState": { "id": "library" }
                        }]
                    }
                }
            })
        );
    }

    #[test]
    fn test_tree_round_trips_unchanged() {
        let raw = json!({
            "settings": { "showCloseIcon": true, "reorderEnabled": false },
            "dimensions": { "borderWidth": 2.5, "minItemHeight": 10 },
            "root": {
                "type": "row",
                "content": [
                    { "type": "stack", "content": [] },
                    {
                        "type": "component",
                        "componentType": "NotePage",
                        "componentState": null,
                        "content": []
                    },
                    { "title": "Untyped", "size": "1fr" }
                ]
            },
            "header": { "popout": "open in new window" }
        });

        let parsed = config(raw.clone());
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);

        let mut normalized = parsed.clone();
        normalize_layout(&mut normalized);
        assert_eq!(normalized, parsed);
    }

    #[test]
    fn test_non_object_config_is_rejected() {
        assert!(serde_json::from_value::<LayoutConfig>(json!("stack")).is_err());
        assert!(serde_json::from_value::<LayoutConfig>(json!([1, 2])).is_err());
    }

    #[test]
    fn test_normalize_forces_close_icon() {
        let mut layout = default_config();
        layout
            .as_map_mut()
            .insert("settings".into(), json!({ "showCloseIcon": false, "hasHeaders": true }));
        assert!(!layout.has_closable_panel());

        normalize_layout(&mut layout);
        assert_eq!(layout.show_close_icon(), Some(true));
        assert_eq!(layout.as_map()["settings"]["hasHeaders"], json!(true));
        assert!(layout.has_closable_panel());
    }

    #[test]
    fn test_normalize_adds_missing_settings() {
        let mut layout = config(json!({ "root": { "type": "stack", "content": [] } }));
        normalize_layout(&mut layout);
        assert_eq!(layout.as_map()["settings"], json!({ "showCloseIcon": true }));
        assert_eq!(layout.as_map()["root"]["content"], json!([]));
    }

    #[test]
    fn test_normalize_reopens_first_component_when_none_closable() {
        let mut layout = config(json!({
            "root": {
                "type": "row",
                "content": [
                    { "type": "stack", "content": [
                        { "type": "component", "componentType": "LibraryPage", "isClosable": false }
                    ]},
                    { "type": "stack", "content": [
                        { "type": "component", "componentType": "NotePage", "isClosable": false }
                    ]}
                ]
            }
        }));

        normalize_layout(&mut layout);

        let components = layout.components();
        assert_eq!(components.len(), 2);
        assert!(components[0].get("isClosable").is_none());
        assert_eq!(components[1]["isClosable"], json!(false));
        assert!(layout.has_closable_panel());
    }

    #[test]
    fn test_normalize_keeps_overrides_when_one_is_closable() {
        let mut layout = config(json!({
            "root": { "type": "stack", "content": [
                { "type": "component", "componentType": "LibraryPage", "isClosable": false },
                { "type": "component", "componentType": "NotePage" }
            ]}
        }));

        normalize_layout(&mut layout);

        let components = layout.components();
        assert_eq!(components[0]["isClosable"], json!(false));
        assert!(components[1].get("isClosable").is_none());
    }
}
