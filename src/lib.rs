//! Persistent UI session state for desktop apps
//!
//! Two singleton documents are kept in a revisioned document store: `appState`
//! (sidebar, selection, open projects, user settings) and `layout` (the dock
//! panel tree). Reads create and persist defaults on first use; updates are
//! debounced so bursts of UI changes produce a single write.

pub mod app_state;
pub mod config;
pub mod debounce;
pub mod document;
pub mod error;
pub mod layout;
pub mod state;

pub use app_state::{AppState, AppStateStore, Settings, APP_STATE_ID};
pub use debounce::Debouncer;
pub use document::{DocumentStore, FileStore, MemoryStore, Revision};
pub use error::StoreError;
pub use layout::{LayoutConfig, LayoutState, LayoutStore, LAYOUT_ID};
pub use state::SessionState;
