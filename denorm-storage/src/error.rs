//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error type observers return to abort a save.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A document with this id already exists.
    #[error("document already exists: {0}")]
    AlreadyExists(String),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The connection lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// A lifecycle observer rejected the operation.
    #[error("lifecycle hook failed: {0}")]
    Hook(#[source] HookError),
}

impl StorageError {
    /// The observer's own error, if this is a hook failure of type `E`.
    pub fn hook_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Hook(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}
