//! Revisioned document storage
//!
//! Documents are JSON objects keyed by `_id`. Every successful put stamps a new
//! `_rev`; a put must carry the revision currently stored (or none, for a new
//! document) or it is rejected as a conflict.

pub mod file;
pub mod memory;

use std::fmt;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";

/// Opaque revision token in `<generation>-<digest>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of writes that produced this revision, if the token is well formed.
    pub fn generation(&self) -> Option<u64> {
        self.0
            .split_once('-')
            .and_then(|(generation, _)| generation.parse().ok())
    }

    fn next(previous: Option<&Revision>, body: &Value) -> Result<Self, StoreError> {
        let generation = previous.and_then(Revision::generation).unwrap_or(0) + 1;
        let digest = Sha256::digest(serde_json::to_vec(body)?);
        Ok(Self(format!("{generation}-{}", &hex::encode(digest)[..32])))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value persistence with optimistic revisioning.
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch a document, failing with [`StoreError::NotFound`] when absent.
    fn get(&self, id: &str) -> impl Future<Output = Result<Value, StoreError>> + Send;

    /// Store a document and return its new revision.
    fn put(&self, doc: Value) -> impl Future<Output = Result<Revision, StoreError>> + Send;
}

/// Fetch a document and deserialize it.
pub async fn fetch<S, T>(store: &S, id: &str) -> Result<T, StoreError>
where
    S: DocumentStore,
    T: DeserializeOwned,
{
    let raw = store.get(id).await?;
    Ok(serde_json::from_value(raw)?)
}

/// Read only the stored revision; `None` when the document does not exist.
pub async fn fetch_revision<S: DocumentStore>(
    store: &S,
    id: &str,
) -> Result<Option<Revision>, StoreError> {
    match store.get(id).await {
        Ok(raw) => Ok(raw
            .get(REV_FIELD)
            .and_then(Value::as_str)
            .map(Revision::new)),
        Err(error) if error.is_not_found() => Ok(None),
        Err(error) => Err(error),
    }
}

/// Serialize a document and put it.
pub async fn save<S, T>(store: &S, doc: &T) -> Result<Revision, StoreError>
where
    S: DocumentStore,
    T: Serialize + Sync,
{
    let raw = serde_json::to_value(doc)?;
    store.put(raw).await
}

pub(crate) fn document_id(doc: &Value) -> Result<&str, StoreError> {
    let object = doc
        .as_object()
        .ok_or_else(|| StoreError::InvalidDocument("document must be a JSON object".into()))?;
    match object.get(ID_FIELD) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id),
        _ => Err(StoreError::InvalidDocument(format!(
            "document must carry a non-empty string '{ID_FIELD}'"
        ))),
    }
}

/// Check the supplied revision against the stored document and stamp a new one.
pub(crate) fn stamp_revision(
    id: &str,
    current: Option<&Value>,
    mut doc: Value,
) -> Result<(Revision, Value), StoreError> {
    let supplied = match doc.as_object_mut().and_then(|object| object.remove(REV_FIELD)) {
        None | Some(Value::Null) => None,
        Some(Value::String(rev)) => Some(rev),
        Some(other) => {
            return Err(StoreError::InvalidDocument(format!(
                "'{REV_FIELD}' must be a string, got {other}"
            )))
        }
    };
    let stored = current
        .and_then(|existing| existing.get(REV_FIELD))
        .and_then(Value::as_str)
        .map(str::to_string);

    if supplied != stored {
        return Err(StoreError::Conflict {
            id: id.to_string(),
            supplied,
            stored,
        });
    }

    let revision = Revision::next(stored.map(Revision::new).as_ref(), &doc)?;
    if let Some(object) = doc.as_object_mut() {
        object.insert(REV_FIELD.to_string(), Value::String(revision.to_string()));
    }
    Ok((revision, doc))
}
