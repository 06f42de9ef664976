//! Error types for the denormalization engine.
//!
//! The first group is raised while a directive is declared and stops the
//! declaration. The second group is raised while a save or update runs and
//! surfaces through that save's result.

use denorm_model::{ModelError, RelationKind};
use denorm_storage::StorageError;
use denorm_types::LifecycleEvent;
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur declaring or running a denormalization.
#[derive(Debug, Error)]
pub enum SyncError {
    // ── Declaration time ─────────────────────────────────────────

    /// The directive does not say which reference the fields come from.
    #[error("option `from` is needed (e.g. denormalize [\"name\"] from \"user\")")]
    MissingSourceOption,

    /// The directive names no fields.
    #[error("at least one field must be denormalized")]
    EmptyFieldList,

    /// `as` does not name exactly one dependent field per source field.
    #[error("option `as` gives {names} names for {fields} fields")]
    ArityMismatch { fields: usize, names: usize },

    /// A polymorphic reference without an explicit candidate list.
    #[error("option `inverses_of` is needed when `{relation}` on {schema} is polymorphic")]
    MissingPolymorphicSources { schema: String, relation: String },

    /// `from` names no relation of the dependent schema.
    #[error("{schema} has no relation `{relation}`")]
    UnknownRelation { schema: String, relation: String },

    /// `from` names a relation that does not store a reference.
    #[error("`{relation}` on {schema} is not a belongs_to reference")]
    NotAReference { schema: String, relation: String },

    /// A source field is declared on none of the candidate source schemas.
    #[error("field `{field}` is not declared on any of: {sources}")]
    UnknownSourceField { field: String, sources: String },

    /// A dependent field would overwrite a field declared for another purpose.
    #[error("field `{field}` is already declared on {schema}")]
    FieldConflict { schema: String, field: String },

    /// Pulls must run before the dependent is written.
    #[error("child callback must run before persisting, got {0}")]
    InvalidTriggerEvent(LifecycleEvent),

    /// Schema declaration or lookup failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A directive manifest could not be parsed.
    #[error("invalid directive configuration: {0}")]
    Config(#[from] serde_json::Error),

    // ── Runtime ──────────────────────────────────────────────────

    /// No relation on the source reaches the dependents.
    #[error("option `inverse_of` is needed for 'belongs_to :{relation}' into {dependent}")]
    UnresolvedInverseRelation { relation: String, dependent: String },

    /// The inverse relation is neither has-one nor has-many.
    #[error("relation type unsupported: `{relation}` on {source_schema} is {kind:?}")]
    UnsupportedRelationCardinality {
        source_schema: String,
        relation: String,
        kind: RelationKind,
    },

    /// Reading a source or dependent from the store failed.
    #[error("store read failed: {0}")]
    CollaboratorReadFailure(#[source] StorageError),

    /// Patching dependents failed; some of them may already be updated.
    #[error("store write failed: {0}")]
    CollaboratorWriteFailure(#[source] StorageError),
}

impl SyncError {
    /// True for errors raised while declaring a directive.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            Self::UnresolvedInverseRelation { .. }
                | Self::UnsupportedRelationCardinality { .. }
                | Self::CollaboratorReadFailure(_)
                | Self::CollaboratorWriteFailure(_)
        )
    }
}
