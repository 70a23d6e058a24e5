//! Directory-backed document store
//!
//! Each document lives in `<root>/<id>.json`. Writes go through a temp file in
//! the same directory and are renamed into place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tempfile::NamedTempFile;

use super::{document_id, stamp_revision, DocumentStore, Revision};
use crate::error::StoreError;

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// The directory is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn document_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        document_path(&self.root, id)
    }
}

impl DocumentStore for FileStore {
    async fn get(&self, id: &str) -> Result<Value, StoreError> {
        let path = self.document_path(id)?;
        let id = id.to_string();
        tokio::task::spawn_blocking(move || -> Result<Value, StoreError> {
            read_document(&path)?.ok_or(StoreError::NotFound { id })
        })
        .await?
    }

    async fn put(&self, doc: Value) -> Result<Revision, StoreError> {
        let root = self.root.clone();
        let write_lock = Arc::clone(&self.write_lock);
        tokio::task::spawn_blocking(move || -> Result<Revision, StoreError> {
            let id = document_id(&doc)?.to_string();
            let path = document_path(&root, &id)?;

            let _guard = write_lock.lock();
            let current = read_document(&path)?;
            let (revision, stamped) = stamp_revision(&id, current.as_ref(), doc)?;
            write_document(&root, &path, &stamped)?;
            log::debug!("Stored '{id}' at revision {revision}");
            Ok(revision)
        })
        .await?
    }
}

fn document_path(root: &Path, id: &str) -> Result<PathBuf, StoreError> {
    if !is_valid_id(id) {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(root.join(format!("{id}.{EXTENSION}")))
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn read_document(path: &Path) -> Result<Option<Value>, StoreError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn write_document(root: &Path, path: &Path, doc: &Value) -> Result<(), StoreError> {
    fs::create_dir_all(root)?;

    let mut file = NamedTempFile::new_in(root)?;
    serde_json::to_writer_pretty(&mut file, doc)?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
