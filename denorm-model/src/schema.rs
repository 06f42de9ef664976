use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::inflect::{pluralize, underscore};
use crate::relation::RelationDescriptor;

/// Describes a document type: its declared fields and relations.
///
/// Built once through [`SchemaBuilder`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    pub model_name: ModelName,
    fields: Vec<FieldDescriptor>,
    relations: Vec<RelationDescriptor>,
}

impl SchemaDescriptor {
    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Declared relations, in declaration order.
    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Reopens the schema for further declarations. The descriptor itself
    /// is left untouched; the builder produces a new one.
    pub fn to_builder(&self) -> SchemaBuilder {
        SchemaBuilder {
            name: self.name.clone(),
            model_name: Some(self.model_name.clone()),
            fields: self.fields.clone(),
            relations: self.relations.clone(),
        }
    }
}

/// Singular and plural forms of a schema name, as relation names use them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelName {
    pub singular: String,
    pub plural: String,
}

impl ModelName {
    /// Derives `child` / `children` from `Child`.
    pub fn from_schema_name(name: &str) -> Self {
        let singular = underscore(name);
        let plural = pluralize(&singular);
        Self { singular, plural }
    }
}

/// A field declared on a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// Shorthand for a text field.
    pub fn text(name: &str) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Shorthand for a numeric field.
    pub fn number(name: &str) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// Shorthand for a boolean field.
    pub fn bool(name: &str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// Shorthand for a DateTime field.
    pub fn datetime(name: &str) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    /// Shorthand for a tag array field.
    pub fn tag(name: &str) -> Self {
        Self::new(name, FieldType::Tag)
    }

    /// Shorthand for a JSON blob field.
    pub fn json(name: &str) -> Self {
        Self::new(name, FieldType::Json)
    }

    /// Shorthand for a document id field.
    pub fn id(name: &str) -> Self {
        Self::new(name, FieldType::Id)
    }
}

/// The value type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Decimal,
    Bool,
    DateTime,
    Tag,
    Json,
    Id,
}

/// Declaration phase of a schema.
///
/// ```
/// use denorm_model::{FieldDescriptor, RelationDescriptor, SchemaBuilder};
///
/// let child = SchemaBuilder::new("Child")
///     .field(FieldDescriptor::text("title"))
///     .relation(RelationDescriptor::belongs_to("parent"))
///     .build()
///     .unwrap();
///
/// assert!(child.has_field("parent_id"));
/// assert_eq!(child.model_name.plural, "children");
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    model_name: Option<ModelName>,
    fields: Vec<FieldDescriptor>,
    relations: Vec<RelationDescriptor>,
}

impl SchemaBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            model_name: None,
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declares a relation. A reference also declares its key field(s).
    pub fn relation(mut self, relation: RelationDescriptor) -> Self {
        if relation.is_reference() {
            self.fields.push(FieldDescriptor::id(&relation.foreign_key));
            if let Some(type_key) = relation.type_key() {
                self.fields.push(FieldDescriptor::text(&type_key));
            }
        }
        self.relations.push(relation);
        self
    }

    /// Overrides the derived singular/plural names.
    pub fn model_name(mut self, singular: &str, plural: &str) -> Self {
        self.model_name = Some(ModelName {
            singular: singular.into(),
            plural: plural.into(),
        });
        self
    }

    pub fn build(self) -> ModelResult<SchemaDescriptor> {
        if self.name.trim().is_empty() {
            return Err(ModelError::InvalidName("schema name is empty".into()));
        }

        for (i, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(ModelError::InvalidName(format!(
                    "empty field name on {}",
                    self.name
                )));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ModelError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        for (i, relation) in self.relations.iter().enumerate() {
            if self.relations[..i].iter().any(|r| r.name == relation.name) {
                return Err(ModelError::DuplicateRelation {
                    schema: self.name.clone(),
                    relation: relation.name.clone(),
                });
            }
        }

        let model_name = self
            .model_name
            .unwrap_or_else(|| ModelName::from_schema_name(&self.name));

        Ok(SchemaDescriptor {
            name: self.name,
            model_name,
            fields: self.fields,
            relations: self.relations,
        })
    }
}
