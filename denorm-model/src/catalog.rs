use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ModelError, ModelResult};
use crate::schema::{FieldDescriptor, SchemaDescriptor};

/// Registry of schema descriptors, looked up by schema name.
///
/// Descriptors are shared as `Arc`s; anything that captured one keeps
/// seeing the version it captured.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, Arc<SchemaDescriptor>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: SchemaDescriptor) -> ModelResult<Arc<SchemaDescriptor>> {
        if self.schemas.contains_key(&schema.name) {
            return Err(ModelError::DuplicateSchema(schema.name));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(schema.name.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<Arc<SchemaDescriptor>> {
        self.schemas.get(name).cloned()
    }

    /// Like [`get`](Self::get) but fails with `UnknownSchema`.
    pub fn require(&self, name: &str) -> ModelResult<Arc<SchemaDescriptor>> {
        self.get(name)
            .ok_or_else(|| ModelError::UnknownSchema(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Declares additional fields on a registered schema.
    ///
    /// All fields are validated before the new descriptor replaces the old
    /// one, so a failure leaves the catalog unchanged.
    pub fn declare_fields(
        &mut self,
        schema: &str,
        fields: impl IntoIterator<Item = FieldDescriptor>,
    ) -> ModelResult<Arc<SchemaDescriptor>> {
        let current = self.require(schema)?;
        let builder = fields
            .into_iter()
            .fold(current.to_builder(), |builder, field| builder.field(field));
        let rebuilt = Arc::new(builder.build()?);
        self.schemas.insert(schema.to_string(), Arc::clone(&rebuilt));
        Ok(rebuilt)
    }
}
