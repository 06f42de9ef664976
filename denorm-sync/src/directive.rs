//! Directive configuration and its validated, immutable form.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use denorm_model::{ModelName, RelationDescriptor, SchemaDescriptor};
use denorm_types::LifecycleEvent;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::relation::{resolve_inverse, InverseRelation};

/// Dependent field name(s) given with `as`: one name or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AsNames {
    One(String),
    Many(Vec<String>),
}

impl AsNames {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

/// A denormalization as declared for one dependent schema.
///
/// ```
/// use denorm_sync::Directive;
///
/// let directive = Directive::new(["name"]).from("parent").prefix("owner");
/// assert_eq!(directive.from.as_deref(), Some("parent"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Directive {
    /// Source fields to mirror, in order.
    pub fields: Vec<String>,
    /// The dependent's reference the fields come from.
    #[serde(default)]
    pub from: Option<String>,
    /// Explicit dependent field names, one per source field.
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub as_names: Option<AsNames>,
    /// Dependent field prefix used instead of the relation name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Candidate source schemas of a polymorphic reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverses_of: Option<Vec<String>>,
    /// When the dependent pulls from its source.
    #[serde(default)]
    pub child_callback: LifecycleEvent,
}

impl Directive {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn from(mut self, relation: &str) -> Self {
        self.from = Some(relation.into());
        self
    }

    /// Single dependent field name.
    pub fn as_name(mut self, name: &str) -> Self {
        self.as_names = Some(AsNames::One(name.into()));
        self
    }

    pub fn as_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.as_names = Some(AsNames::Many(names.into_iter().map(Into::into).collect()));
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn inverses_of<I, S>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inverses_of = Some(schemas.into_iter().map(Into::into).collect());
        self
    }

    pub fn child_callback(mut self, event: LifecycleEvent) -> Self {
        self.child_callback = event;
        self
    }
}

/// Directives keyed by dependent schema name, as loaded from JSON.
///
/// ```json
/// { "Child": [ { "fields": ["name"], "from": "parent" } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectiveManifest {
    pub schemas: BTreeMap<String, Vec<Directive>>,
}

impl DirectiveManifest {
    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One mirrored field: `dependent[dependent_field] = source[source_field]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_field: String,
    pub dependent_field: String,
}

impl FieldMapping {
    pub fn new(source_field: &str, dependent_field: &str) -> Self {
        Self {
            source_field: source_field.into(),
            dependent_field: dependent_field.into(),
        }
    }
}

/// A candidate source schema with the mappings it can contribute.
#[derive(Debug)]
pub struct SourceBinding {
    schema: Arc<SchemaDescriptor>,
    mappings: Vec<FieldMapping>,
    inverse: OnceLock<InverseRelation>,
}

impl SourceBinding {
    pub(crate) fn new(schema: Arc<SchemaDescriptor>, mappings: Vec<FieldMapping>) -> Self {
        Self {
            schema,
            mappings,
            inverse: OnceLock::new(),
        }
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// The directive's mappings whose source field this schema declares.
    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    /// The relation on this source that addresses its dependents.
    ///
    /// Resolved on first use and cached; a failed resolution is retried
    /// (and fails again) on the next call.
    pub fn inverse(&self, directive: &SyncDirective) -> SyncResult<&InverseRelation> {
        if let Some(inverse) = self.inverse.get() {
            return Ok(inverse);
        }
        let resolved = resolve_inverse(
            &self.schema,
            &directive.dependent_schema,
            &directive.dependent_model,
            &directive.reference,
        )?;
        Ok(self.inverse.get_or_init(|| resolved))
    }

    /// Whether the inverse relation has been resolved yet.
    pub fn is_inverse_resolved(&self) -> bool {
        self.inverse.get().is_some()
    }
}

/// A validated directive. Immutable once registered.
#[derive(Debug)]
pub struct SyncDirective {
    pub(crate) dependent_schema: String,
    pub(crate) dependent_model: ModelName,
    pub(crate) reference: RelationDescriptor,
    pub(crate) field_mappings: Vec<FieldMapping>,
    pub(crate) sources: Vec<SourceBinding>,
    pub(crate) trigger_event: LifecycleEvent,
}

impl SyncDirective {
    pub fn dependent_schema(&self) -> &str {
        &self.dependent_schema
    }

    /// The dependent's reference to its source.
    pub fn reference(&self) -> &RelationDescriptor {
        &self.reference
    }

    pub fn source_relation_name(&self) -> &str {
        &self.reference.name
    }

    pub fn field_mappings(&self) -> &[FieldMapping] {
        &self.field_mappings
    }

    pub fn sources(&self) -> &[SourceBinding] {
        &self.sources
    }

    /// The binding for the source schema named `schema`, if it is a candidate.
    pub fn source(&self, schema: &str) -> Option<&SourceBinding> {
        self.sources.iter().find(|s| s.schema.name == schema)
    }

    pub fn trigger_event(&self) -> LifecycleEvent {
        self.trigger_event
    }

    pub fn is_polymorphic(&self) -> bool {
        self.reference.is_polymorphic()
    }
}
