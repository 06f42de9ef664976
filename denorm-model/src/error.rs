//! Error types for schema declaration.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while declaring or registering schemas.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A field with this name is already declared on the schema.
    #[error("field `{field}` is already declared on {schema}")]
    DuplicateField { schema: String, field: String },

    /// A relation with this name is already declared on the schema.
    #[error("relation `{relation}` is already declared on {schema}")]
    DuplicateRelation { schema: String, relation: String },

    /// A schema with this name is already registered.
    #[error("schema {0} is already registered")]
    DuplicateSchema(String),

    /// No schema with this name is registered.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// Schema or field name is empty.
    #[error("invalid name: {0}")]
    InvalidName(String),
}
