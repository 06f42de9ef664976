//! Persistence collaborator for denorm.
//!
//! Provides the document store the sync core writes through and the
//! lifecycle driver that raises save/update notifications.
//!
//! # Architecture
//!
//! - [`DocumentStore`] is the contract: lookups plus `$set`-style partial
//!   updates that touch only the named fields
//! - [`SqliteDocumentStore`] keeps documents as JSON in a single SQLite table
//!   and applies patches with `json_set`
//! - [`Repository`] runs creates and saves through the store, notifying
//!   every [`LifecycleObserver`] before and after the write

mod error;
mod query;
mod repository;
mod sqlite;
mod store;

pub use error::{HookError, StorageError, StorageResult};
pub use query::{Filter, Patch};
pub use repository::{LifecycleObserver, Repository};
pub use sqlite::SqliteDocumentStore;
pub use store::DocumentStore;
