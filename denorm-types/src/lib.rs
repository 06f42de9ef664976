//! Core type definitions for denorm.
//!
//! This crate defines the fundamental, schema-agnostic types shared by the
//! model, storage and sync layers:
//! - Document identifiers (UUID v7)
//! - Lifecycle events raised by the persistence framework around a save
//!
//! Anything that knows about fields, relations or directives belongs in the
//! higher crates, not here.

mod event;
mod ids;

pub use event::LifecycleEvent;
pub use ids::DocumentId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid document id `{value}`: {source}")]
    InvalidDocumentId {
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error("unknown lifecycle event: {0}")]
    UnknownLifecycleEvent(String),
}
