//! Sync engine: validates directives, declares the mirrored fields and
//! registers the pull and cascade hooks.
//!
//! The engine holds no documents. Once every directive is declared it is
//! handed to a [`Repository`](denorm_storage::Repository) as a
//! [`LifecycleObserver`] and reacts to the saves the repository drives.

use std::collections::HashMap;
use std::sync::Arc;

use denorm_model::{
    Document, FieldDescriptor, FieldType, RelationDescriptor, SchemaCatalog, SchemaDescriptor,
};
use denorm_storage::{DocumentStore, HookError, LifecycleObserver};
use denorm_types::LifecycleEvent;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cascade::ParentCascadeHook;
use crate::child::ChildSyncHook;
use crate::directive::{Directive, DirectiveManifest, FieldMapping, SourceBinding, SyncDirective};
use crate::error::{SyncError, SyncResult};
use crate::mapping::{check_source_fields, mappings_for_source, resolve_field_mappings};
use crate::registry::HookRegistry;
use crate::relation::{resolve_reference, resolve_sources};

/// When the inverse relation of each source is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InverseValidation {
    /// On the first cascade from that source.
    #[default]
    Lazy,
    /// While the directive is declared; a missing or unsupported inverse
    /// fails the declaration.
    Eager,
}

/// Configuration for the sync engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub inverse_validation: InverseValidation,
}

/// Registry of directives and the hooks they installed.
pub struct SyncEngine {
    config: EngineConfig,
    registry: HookRegistry,
    /// Directives keyed by (dependent schema, reference name).
    directives: HashMap<(String, String), Vec<Arc<SyncDirective>>>,
    /// Mirrored dependent fields keyed by (dependent schema, field).
    mirrored: HashMap<(String, String), MirroredField>,
}

/// Who feeds a mirrored dependent field.
#[derive(Debug)]
struct MirroredField {
    reference: String,
    /// Source schemas already writing the field.
    sources: Vec<String>,
}

impl SyncEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: HookRegistry::new(),
            directives: HashMap::new(),
            mirrored: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Directives declared for `relation` of `dependent`, in declaration order.
    pub fn directives(&self, dependent: &str, relation: &str) -> &[Arc<SyncDirective>] {
        self.directives
            .get(&(dependent.to_string(), relation.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Declares every directive of a manifest, schema by schema.
    ///
    /// Stops at the first failing directive; the ones before it stay
    /// declared.
    pub fn load_manifest(
        &mut self,
        catalog: &mut SchemaCatalog,
        manifest: &DirectiveManifest,
    ) -> SyncResult<Vec<Arc<SyncDirective>>> {
        let mut declared = Vec::new();
        for (dependent, directives) in &manifest.schemas {
            for directive in directives {
                declared.push(self.denormalize(catalog, dependent, directive.clone())?);
            }
        }
        Ok(declared)
    }

    /// Validates `directive` for the `dependent` schema, declares its
    /// dependent fields on the catalog and registers its hooks.
    ///
    /// Nothing is declared or registered unless every check passes.
    pub fn denormalize(
        &mut self,
        catalog: &mut SchemaCatalog,
        dependent: &str,
        directive: Directive,
    ) -> SyncResult<Arc<SyncDirective>> {
        let field_mappings = resolve_field_mappings(&directive)?;
        let dependent_schema = catalog.require(dependent)?;
        let from = directive.from.as_deref().unwrap_or_default();
        let reference = resolve_reference(&dependent_schema, from)?.clone();

        let trigger_event = directive.child_callback;
        if !trigger_event.is_before_persist() {
            return Err(SyncError::InvalidTriggerEvent(trigger_event));
        }

        let sources = resolve_sources(
            catalog,
            &dependent_schema,
            &reference,
            directive.inverses_of.as_deref(),
        )?;
        check_source_fields(&field_mappings, &sources)?;
        let new_fields =
            self.check_dependent_fields(&dependent_schema, &reference, &sources, &field_mappings)?;

        let sync_directive = Arc::new(SyncDirective {
            dependent_schema: dependent_schema.name.clone(),
            dependent_model: dependent_schema.model_name.clone(),
            reference,
            sources: sources
                .iter()
                .map(|source| {
                    let mappings = mappings_for_source(&field_mappings, source);
                    SourceBinding::new(Arc::clone(source), mappings)
                })
                .collect(),
            field_mappings,
            trigger_event,
        });

        if self.config.inverse_validation == InverseValidation::Eager {
            for binding in sync_directive.sources() {
                binding.inverse(&sync_directive)?.cardinality()?;
            }
        }

        let declarations: Vec<FieldDescriptor> = new_fields
            .iter()
            .map(|(dependent_field, source_field)| {
                FieldDescriptor::new(dependent_field, source_field_type(&sources, source_field))
            })
            .collect();
        catalog.declare_fields(dependent, declarations)?;
        for mapping in sync_directive.field_mappings() {
            self.mirrored
                .entry((
                    sync_directive.dependent_schema.clone(),
                    mapping.dependent_field.clone(),
                ))
                .or_insert_with(|| MirroredField {
                    reference: sync_directive.reference.name.clone(),
                    sources: Vec::new(),
                })
                .sources
                .extend(writers_of(&sources, &mapping.source_field));
        }

        self.register_hooks(&sync_directive);
        self.directives
            .entry((
                sync_directive.dependent_schema.clone(),
                sync_directive.reference.name.clone(),
            ))
            .or_default()
            .push(Arc::clone(&sync_directive));

        info!(
            "Denormalized {:?} from {}.{} ({} sources, pull at {})",
            sync_directive
                .field_mappings()
                .iter()
                .map(|m| m.dependent_field.as_str())
                .collect::<Vec<_>>(),
            sync_directive.dependent_schema(),
            sync_directive.source_relation_name(),
            sync_directive.sources().len(),
            trigger_event
        );
        Ok(sync_directive)
    }

    /// Returns the `(dependent_field, source_field)` pairs that still need
    /// declaring.
    ///
    /// A field already mirrored through the same polymorphic reference is
    /// shared when none of the source schemas writing it here writes it
    /// already. Any other existing field is a conflict.
    fn check_dependent_fields(
        &self,
        dependent: &SchemaDescriptor,
        reference: &RelationDescriptor,
        sources: &[Arc<SchemaDescriptor>],
        mappings: &[FieldMapping],
    ) -> SyncResult<Vec<(String, String)>> {
        let mut new_fields: Vec<(String, String)> = Vec::new();
        for (i, mapping) in mappings.iter().enumerate() {
            let conflict = || SyncError::FieldConflict {
                schema: dependent.name.clone(),
                field: mapping.dependent_field.clone(),
            };
            if mappings[..i]
                .iter()
                .any(|m| m.dependent_field == mapping.dependent_field)
            {
                return Err(conflict());
            }
            if dependent.has_field(&mapping.dependent_field) {
                let key = (dependent.name.clone(), mapping.dependent_field.clone());
                let writers = writers_of(sources, &mapping.source_field);
                let shareable = self.mirrored.get(&key).is_some_and(|owner| {
                    reference.is_polymorphic()
                        && owner.reference == reference.name
                        && !owner.sources.iter().any(|s| writers.contains(s))
                });
                if !shareable {
                    return Err(conflict());
                }
                continue;
            }
            new_fields.push((mapping.dependent_field.clone(), mapping.source_field.clone()));
        }
        Ok(new_fields)
    }

    fn register_hooks(&mut self, directive: &Arc<SyncDirective>) {
        let label = format!(
            "denormalize {}.{}",
            directive.dependent_schema(),
            directive.source_relation_name()
        );

        let child = ChildSyncHook::new(Arc::clone(directive));
        self.registry.register(
            directive.dependent_schema(),
            directive.trigger_event(),
            format!("{label} (pull)"),
            move |document, store| child.pull(document, store).map(|_| ()),
        );

        for (index, binding) in directive.sources().iter().enumerate() {
            if binding.mappings().is_empty() {
                debug!(
                    "{} contributes no fields to {}, no cascade registered",
                    binding.schema().name,
                    label
                );
                continue;
            }
            let cascade = ParentCascadeHook::new(Arc::clone(directive), index);
            self.registry.register(
                &binding.schema().name,
                LifecycleEvent::AfterUpdate,
                format!("{label} (cascade)"),
                move |document, store| cascade.cascade(document, store).map(|_| ()),
            );
        }
    }

    /// Runs the hooks registered for the document's schema at `event`.
    pub fn dispatch(
        &self,
        event: LifecycleEvent,
        document: &mut Document,
        store: &dyn DocumentStore,
    ) -> SyncResult<()> {
        self.registry.dispatch(event, document, store)
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl LifecycleObserver for SyncEngine {
    fn notify(
        &self,
        event: LifecycleEvent,
        document: &mut Document,
        store: &dyn DocumentStore,
    ) -> Result<(), HookError> {
        self.dispatch(event, document, store).map_err(HookError::from)
    }
}

/// Type of the dependent field: that of the first source declaring the
/// source field.
fn source_field_type(sources: &[Arc<SchemaDescriptor>], source_field: &str) -> FieldType {
    sources
        .iter()
        .find_map(|s| s.field(source_field))
        .map_or(FieldType::Json, |f| f.field_type)
}

/// Names of the sources declaring `source_field`.
fn writers_of(sources: &[Arc<SchemaDescriptor>], source_field: &str) -> Vec<String> {
    sources
        .iter()
        .filter(|s| s.has_field(source_field))
        .map(|s| s.name.clone())
        .collect()
}
