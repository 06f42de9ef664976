//! Document and schema model for denorm.
//!
//! Defines the types the persistence framework exposes to the sync core:
//! - [`Document`]: the runtime container (id, schema, JSON fields) with dirty tracking
//! - [`SchemaDescriptor`]: an immutable description of a schema's fields and relations
//! - [`SchemaBuilder`]: the declaration phase that produces descriptors
//! - [`RelationDescriptor`]: cardinality, target and inverse metadata of a reference
//! - [`SchemaCatalog`]: the registry schemas are introspected from by name
//!
//! Descriptors are never mutated once built. Declaring a field after the fact
//! rebuilds the descriptor and swaps it in the catalog.

mod catalog;
mod document;
mod error;
mod inflect;
mod relation;
mod schema;

pub use catalog::SchemaCatalog;
pub use document::Document;
pub use error::{ModelError, ModelResult};
pub use inflect::{camelize, pluralize, underscore};
pub use relation::{Cardinality, RelationDescriptor, RelationKind, RelationTarget};
pub use schema::{FieldDescriptor, FieldType, ModelName, SchemaBuilder, SchemaDescriptor};
