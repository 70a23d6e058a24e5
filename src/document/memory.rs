use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use super::{document_id, stamp_revision, DocumentStore, Revision};
use crate::error::StoreError;

/// In-process document store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.read().contains_key(id)
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Value, StoreError> {
        self.docs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    async fn put(&self, doc: Value) -> Result<Revision, StoreError> {
        let id = document_id(&doc)?.to_string();
        let mut docs = self.docs.write();
        let (revision, stamped) = stamp_revision(&id, docs.get(&id), doc)?;
        docs.insert(id, stamped);
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let error = store.get("appState").await.unwrap_err();
        assert!(error.is_not_found());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_then_get_returns_stamped_document() {
        let store = MemoryStore::new();
        let rev = store.put(json!({"_id": "layout", "config": {}})).await.unwrap();

        let doc = store.get("layout").await.unwrap();
        assert_eq!(doc["_rev"], json!(rev.as_str()));
        assert_eq!(doc["config"], json!({}));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_put_leaves_document_untouched() {
        let store = MemoryStore::new();
        let first = store.put(json!({"_id": "a", "v": 1})).await.unwrap();
        store
            .put(json!({"_id": "a", "_rev": first.as_str(), "v": 2}))
            .await
            .unwrap();

        let error = store
            .put(json!({"_id": "a", "_rev": first.as_str(), "v": 3}))
            .await
            .unwrap_err();
        assert!(error.is_conflict());
        assert_eq!(store.get("a").await.unwrap()["v"], json!(2));
    }
}
