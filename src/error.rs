use thiserror::Error;

/// Errors raised by a [`DocumentStore`](crate::document::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document '{id}' not found")]
    NotFound { id: String },

    #[error("revision conflict on '{id}': supplied {supplied:?}, stored {stored:?}")]
    Conflict {
        id: String,
        supplied: Option<String>,
        stored: Option<String>,
    },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid document id '{0}'")]
    InvalidId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
