use denorm_types::DocumentId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::relation::RelationDescriptor;

/// A document of some schema, as loaded from or about to be written to the store.
///
/// `data` holds the document's fields. The snapshot of the last persisted
/// state is kept alongside so hooks can ask what changed; it is never
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub schema: String,
    pub data: Map<String, Value>,
    pub created_at: i64,
    pub modified_at: i64,
    #[serde(skip)]
    persisted: Option<Map<String, Value>>,
}

impl Document {
    /// A new, never persisted document of `schema`.
    pub fn new(schema: &str) -> Self {
        Self {
            id: DocumentId::new(),
            schema: schema.into(),
            data: Map::new(),
            created_at: 0,
            modified_at: 0,
            persisted: None,
        }
    }

    /// A document as read back from the store; its current state is clean.
    pub fn from_stored(
        id: DocumentId,
        schema: &str,
        data: Map<String, Value>,
        created_at: i64,
        modified_at: i64,
    ) -> Self {
        Self {
            id,
            schema: schema.into(),
            persisted: Some(data.clone()),
            data,
            created_at,
            modified_at,
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Returns true if the field holds a value other than null.
    pub fn is_set(&self, field: &str) -> bool {
        self.data.get(field).is_some_and(|v| !v.is_null())
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.data.insert(field.to_string(), value.into());
    }

    /// True until the document has been written once.
    pub fn is_new(&self) -> bool {
        self.persisted.is_none()
    }

    /// Value of `field` at the last persist, `None` for new documents.
    pub fn was(&self, field: &str) -> Option<&Value> {
        self.persisted.as_ref().and_then(|p| p.get(field))
    }

    /// Whether `field` differs from its persisted value. On a new document
    /// every non-null field counts as changed.
    pub fn changed(&self, field: &str) -> bool {
        match &self.persisted {
            None => self.is_set(field),
            Some(persisted) => {
                let now = self.data.get(field).unwrap_or(&Value::Null);
                let before = persisted.get(field).unwrap_or(&Value::Null);
                now != before
            }
        }
    }

    /// Names of all changed fields, sorted.
    pub fn changed_fields(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.data.keys().map(String::as_str).collect();
        if let Some(persisted) = &self.persisted {
            names.extend(
                persisted
                    .keys()
                    .map(String::as_str)
                    .filter(|k| !self.data.contains_key(*k)),
            );
        }
        names.retain(|name| self.changed(name));
        names.sort_unstable();
        names
    }

    pub fn has_changes(&self) -> bool {
        !self.changed_fields().is_empty()
    }

    /// Records the current state as the persisted one.
    pub fn mark_persisted(&mut self) {
        self.persisted = Some(self.data.clone());
    }

    /// Points a reference at `target`, or clears it.
    ///
    /// Writes the foreign key and, for polymorphic references, the target's
    /// schema name.
    pub fn assign(&mut self, relation: &RelationDescriptor, target: Option<&Document>) {
        let id = target.map_or(Value::Null, |t| Value::from(t.id));
        self.set(&relation.foreign_key, id);
        if let Some(type_key) = relation.type_key() {
            let schema = target.map_or(Value::Null, |t| Value::from(t.schema.as_str()));
            self.set(&type_key, schema);
        }
    }

    /// The id stored in a reference's foreign key, if it parses.
    pub fn reference_id(&self, relation: &RelationDescriptor) -> Option<DocumentId> {
        self.get(&relation.foreign_key).and_then(DocumentId::from_value)
    }
}
