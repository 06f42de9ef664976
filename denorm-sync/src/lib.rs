//! Denormalization engine for denorm.
//!
//! Mirrors selected fields of a source document into the documents that
//! reference it, so readers of a dependent never need a second lookup.
//!
//! # Architecture
//!
//! A [`Directive`] is declared once per dependent schema and reference. The
//! [`SyncEngine`] validates it and installs two kinds of hooks:
//!
//! - **Pull** ([`ChildSyncHook`]): before a dependent is written, copies the
//!   mapped fields from the source it now references
//! - **Cascade** ([`ParentCascadeHook`]): after a source update committed,
//!   patches the changed fields into every current dependent
//!
//! Cascades patch dependents directly in the store, so a reader can observe a
//! stale dependent between the source commit and the patch.
//!
//! # Example
//!
//! ```
//! use denorm_model::{FieldDescriptor, RelationDescriptor, SchemaBuilder, SchemaCatalog};
//! use denorm_sync::{Directive, EngineConfig, SyncEngine};
//!
//! let mut catalog = SchemaCatalog::new();
//! catalog
//!     .register(
//!         SchemaBuilder::new("Parent")
//!             .field(FieldDescriptor::text("name"))
//!             .relation(RelationDescriptor::has_many("children", "Child"))
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//! catalog
//!     .register(
//!         SchemaBuilder::new("Child")
//!             .relation(RelationDescriptor::belongs_to("parent"))
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let mut engine = SyncEngine::new(EngineConfig::default());
//! engine
//!     .denormalize(&mut catalog, "Child", Directive::new(["name"]).from("parent"))
//!     .unwrap();
//! assert!(catalog.get("Child").unwrap().has_field("parent_name"));
//! ```

mod cascade;
mod child;
mod directive;
mod engine;
mod error;
mod mapping;
mod registry;
mod relation;

pub use cascade::ParentCascadeHook;
pub use child::ChildSyncHook;
pub use directive::{
    AsNames, Directive, DirectiveManifest, FieldMapping, SourceBinding, SyncDirective,
};
pub use engine::{EngineConfig, InverseValidation, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use mapping::{check_source_fields, mappings_for_source, resolve_field_mappings};
pub use registry::{HookFn, HookRegistry};
pub use relation::{resolve_inverse, resolve_reference, resolve_sources, InverseRelation};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
