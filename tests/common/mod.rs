#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use session_state::{DocumentStore, MemoryStore, Revision, StoreError};

pub const WINDOW: Duration = Duration::from_millis(200);

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Generation of the stored revision, i.e. how many times the document was written.
pub async fn generation<S: DocumentStore>(store: &S, id: &str) -> u64 {
    let doc = store.get(id).await.expect("document should exist");
    doc["_rev"]
        .as_str()
        .map(Revision::new)
        .and_then(|rev| rev.generation())
        .expect("stored document should carry a revision")
}

/// Wait long enough for any pending debounced write to land.
pub async fn settle() {
    tokio::time::sleep(WINDOW + Duration::from_millis(100)).await;
}

/// Store that serves reads from memory but rejects every write.
#[derive(Default)]
pub struct ReadOnlyStore {
    pub inner: MemoryStore,
}

impl DocumentStore for ReadOnlyStore {
    async fn get(&self, id: &str) -> Result<Value, StoreError> {
        self.inner.get(id).await
    }

    async fn put(&self, doc: Value) -> Result<Revision, StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("read-only store rejected {}", doc["_id"]),
        )))
    }
}
