use std::sync::Arc;
use std::time::Duration;

use crate::app_state::AppStateStore;
use crate::config::SessionConfig;
use crate::document::{DocumentStore, FileStore};
use crate::layout::LayoutStore;

/// Both session documents over one shared store.
pub struct SessionState<S> {
    pub app_state: AppStateStore<S>,
    pub layout: LayoutStore<S>,
    store: Arc<S>,
}

impl<S: DocumentStore> SessionState<S> {
    pub fn with_store(store: Arc<S>, debounce: Duration) -> Self {
        Self {
            app_state: AppStateStore::with_window(Arc::clone(&store), debounce),
            layout: LayoutStore::with_window(Arc::clone(&store), debounce),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl SessionState<FileStore> {
    pub fn open(config: &SessionConfig) -> Self {
        let store = FileStore::new(config.store_dir());
        log::debug!("Opening session store at {}", store.root().display());
        Self::with_store(Arc::new(store), config.debounce_window())
    }
}
