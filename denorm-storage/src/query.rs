//! Filters and patches understood by every [`DocumentStore`](crate::DocumentStore).

use serde_json::{Map, Value};

/// Field name → new value. Applying a patch sets exactly these fields and
/// leaves every other field of the document untouched.
pub type Patch = Map<String, Value>;

/// Conjunction of field equality clauses.
///
/// A missing field matches a `null` clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field == value`.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push((field.to_string(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether a document's fields satisfy every clause.
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| data.get(field).unwrap_or(&Value::Null) == expected)
    }
}
