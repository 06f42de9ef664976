use serde::{Deserialize, Serialize};

use crate::inflect::camelize;

/// How a relation is stored and which side owns the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// This document stores the foreign key of its target.
    BelongsTo,
    /// At most one document of the target schema references this one.
    HasOne,
    /// Any number of documents of the target schema reference this one.
    HasMany,
    /// Both sides store lists of keys.
    HasAndBelongsToMany,
}

impl RelationKind {
    /// Cardinality seen from the declaring side.
    pub const fn cardinality(self) -> Cardinality {
        match self {
            Self::BelongsTo | Self::HasOne => Cardinality::One,
            Self::HasMany => Cardinality::Many,
            Self::HasAndBelongsToMany => Cardinality::ManyToMany,
        }
    }
}

/// How many documents a relation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    Many,
    ManyToMany,
}

/// The schema(s) a relation points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationTarget {
    /// A single, statically known schema.
    Schema(String),
    /// The concrete schema varies per document and is stored next to the key.
    Polymorphic,
}

/// Relation metadata as declared on a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub name: String,
    pub kind: RelationKind,
    pub target: RelationTarget,
    /// Name of the relation on the target that points back, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_of: Option<String>,
    /// Field holding the referenced id. Only meaningful for `BelongsTo`.
    pub foreign_key: String,
}

impl RelationDescriptor {
    fn new(name: &str, kind: RelationKind, target: RelationTarget) -> Self {
        Self {
            name: name.into(),
            kind,
            target,
            inverse_of: None,
            foreign_key: format!("{name}_id"),
        }
    }

    /// A reference to the schema named after the relation (`parent` → `Parent`).
    pub fn belongs_to(name: &str) -> Self {
        Self::new(name, RelationKind::BelongsTo, RelationTarget::Schema(camelize(name)))
    }

    /// A reference whose target schema is recorded per document in `<name>_type`.
    pub fn polymorphic(name: &str) -> Self {
        Self::new(name, RelationKind::BelongsTo, RelationTarget::Polymorphic)
    }

    /// Shorthand for a has-one relation to `target`.
    pub fn has_one(name: &str, target: &str) -> Self {
        Self::new(name, RelationKind::HasOne, RelationTarget::Schema(target.into()))
    }

    /// Shorthand for a has-many relation to `target`.
    pub fn has_many(name: &str, target: &str) -> Self {
        Self::new(name, RelationKind::HasMany, RelationTarget::Schema(target.into()))
    }

    /// Shorthand for a many-to-many relation to `target`.
    pub fn has_and_belongs_to_many(name: &str, target: &str) -> Self {
        Self::new(
            name,
            RelationKind::HasAndBelongsToMany,
            RelationTarget::Schema(target.into()),
        )
    }

    /// Overrides the target schema name.
    pub fn with_class_name(mut self, schema: &str) -> Self {
        self.target = RelationTarget::Schema(schema.into());
        self
    }

    /// Declares the relation on the target that points back to this one.
    pub fn with_inverse_of(mut self, inverse: &str) -> Self {
        self.inverse_of = Some(inverse.into());
        self
    }

    /// Overrides the foreign key field name.
    pub fn with_foreign_key(mut self, field: &str) -> Self {
        self.foreign_key = field.into();
        self
    }

    pub fn is_polymorphic(&self) -> bool {
        self.target == RelationTarget::Polymorphic
    }

    pub fn is_reference(&self) -> bool {
        self.kind == RelationKind::BelongsTo
    }

    pub fn cardinality(&self) -> Cardinality {
        self.kind.cardinality()
    }

    /// Field storing the referenced schema name of a polymorphic reference.
    pub fn type_key(&self) -> Option<String> {
        self.is_polymorphic().then(|| format!("{}_type", self.name))
    }

    /// Target schema name, `None` when polymorphic.
    pub fn target_schema(&self) -> Option<&str> {
        match &self.target {
            RelationTarget::Schema(name) => Some(name),
            RelationTarget::Polymorphic => None,
        }
    }
}
