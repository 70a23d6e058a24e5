//! Application chrome and user preferences
//!
//! A single `appState` document holds the sidebar state, the selected folder,
//! the open projects and the user settings. It is created with defaults on the
//! first read and afterwards only rewritten through the debounced update path.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::debounce::{Debouncer, DEFAULT_WINDOW};
use crate::document::{self, DocumentStore, Revision};
use crate::error::StoreError;

pub const APP_STATE_ID: &str = "appState";

/// Folder selected before the user picks one.
pub const LIBRARY_FOLDER_ID: &str = "library";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,
    pub data_type: String,
    /// Sidebar width as a percentage of the window.
    pub left_menu_size: f64,
    pub show_left_menu: bool,
    pub selected_folder_id: String,
    pub working_item_id: String,
    pub opened_project_ids: Vec<String>,
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: String,
    pub language: String,
    pub storage_path: String,
    pub font_size: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            id: APP_STATE_ID.into(),
            rev: None,
            data_type: APP_STATE_ID.into(),
            left_menu_size: 20.0,
            show_left_menu: false,
            selected_folder_id: LIBRARY_FOLDER_ID.into(),
            working_item_id: String::new(),
            opened_project_ids: Vec::new(),
            settings: Settings::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "dark".into(),
            language: "en_US".into(),
            storage_path: String::new(),
            font_size: "16px".into(),
        }
    }
}

/// Owner of the `appState` document.
pub struct AppStateStore<S> {
    store: Arc<S>,
    debouncer: Debouncer<AppState>,
}

impl<S: DocumentStore> AppStateStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_window(store, DEFAULT_WINDOW)
    }

    pub fn with_window(store: Arc<S>, window: Duration) -> Self {
        Self {
            store,
            debouncer: Debouncer::new(window),
        }
    }

    /// Load the stored state, creating and persisting the default when absent.
    ///
    /// A document that exists but cannot be read falls back to an unsaved
    /// default; a wrong-shape stored copy stays until the next update
    /// overwrites it.
    /// Only a failure to persist a freshly created default is returned as an
    /// error.
    pub async fn get_app_state(&self) -> Result<AppState, StoreError> {
        match document::fetch::<S, AppState>(self.store.as_ref(), APP_STATE_ID).await {
            Ok(state) => Ok(state),
            Err(error) if error.is_not_found() => {
                let mut state = AppState::default();
                state.rev = Some(document::save(self.store.as_ref(), &state).await?);
                log::debug!("Created default app state");
                Ok(state)
            }
            Err(error) => {
                log::warn!("Unable to read app state, using defaults: {error}");
                Ok(AppState::default())
            }
        }
    }

    /// Schedule a write of `state`. Calls within the debounce window collapse
    /// into one write of the latest state; failures are logged, not returned.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn update_app_state(&self, state: AppState) {
        let store = Arc::clone(&self.store);
        self.debouncer.call(state, move |state| async move {
            if let Err(error) = persist_app_state(store.as_ref(), state).await {
                log::warn!("Failed to save app state: {error}");
            }
        });
    }

    /// Write `state` immediately over whatever is stored.
    ///
    /// The stored revision is read right before the put, so a stale `state`
    /// replaces every field of a concurrently written document.
    pub async fn write_app_state(&self, state: AppState) -> Result<AppState, StoreError> {
        persist_app_state(self.store.as_ref(), state).await
    }

    pub fn debounce_window(&self) -> Duration {
        self.debouncer.window()
    }
}

async fn persist_app_state<S: DocumentStore>(
    store: &S,
    mut state: AppState,
) -> Result<AppState, StoreError> {
    state.id = APP_STATE_ID.into();
    state.data_type = APP_STATE_ID.into();
    state.rev = document::fetch_revision(store, APP_STATE_ID).await?;
    state.rev = Some(document::save(store, &state).await?);
    log::debug!("Saved app state");
    Ok(state)
}
