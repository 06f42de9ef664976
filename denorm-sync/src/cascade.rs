//! Push side: writes changed source fields into every current dependent
//! after the source's update was committed.
//!
//! Dependents are patched directly in the store, not saved, so their own
//! lifecycle hooks (the pull in particular) do not run. Between the source
//! commit and the patch a reader can observe a stale dependent.

use std::sync::Arc;

use denorm_model::{Cardinality, Document};
use denorm_storage::{DocumentStore, Filter, Patch};
use serde_json::Value;
use tracing::debug;

use crate::directive::{SourceBinding, SyncDirective};
use crate::error::{SyncError, SyncResult};

/// Registered on one candidate source schema at `AfterUpdate`.
#[derive(Debug, Clone)]
pub struct ParentCascadeHook {
    directive: Arc<SyncDirective>,
    source_index: usize,
}

impl ParentCascadeHook {
    pub(crate) fn new(directive: Arc<SyncDirective>, source_index: usize) -> Self {
        Self {
            directive,
            source_index,
        }
    }

    pub fn directive(&self) -> &Arc<SyncDirective> {
        &self.directive
    }

    pub fn source(&self) -> &SourceBinding {
        &self.directive.sources()[self.source_index]
    }

    /// Patch of `{dependent_field: new value}` for the mapped fields this
    /// update changed.
    pub fn changed_patch(&self, source: &Document) -> Patch {
        self.source()
            .mappings()
            .iter()
            .filter(|m| source.changed(&m.source_field))
            .map(|m| {
                let value = source.get(&m.source_field).cloned().unwrap_or(Value::Null);
                (m.dependent_field.clone(), value)
            })
            .collect()
    }

    /// Pushes changed fields to the dependents of `source`. Returns how many
    /// dependents were patched.
    ///
    /// A failed bulk patch is reported as is; dependents patched before the
    /// failure keep the new values and nothing is retried.
    pub fn cascade(&self, source: &Document, store: &dyn DocumentStore) -> SyncResult<usize> {
        let patch = self.changed_patch(source);
        if patch.is_empty() {
            return Ok(0);
        }

        let binding = self.source();
        let inverse = binding.inverse(&self.directive)?;
        let dependent_schema = self.directive.dependent_schema();
        let filter = self.dependents_of(source);

        let patched = if inverse.cardinality()? == Cardinality::One {
            let dependent = store
                .find_one(dependent_schema, &filter)
                .map_err(SyncError::CollaboratorReadFailure)?;
            match dependent {
                Some(dependent) => {
                    let updated = store
                        .update_one(dependent_schema, dependent.id, &patch)
                        .map_err(SyncError::CollaboratorWriteFailure)?;
                    usize::from(updated)
                }
                None => 0,
            }
        } else {
            store
                .update_many(dependent_schema, &filter, &patch)
                .map_err(SyncError::CollaboratorWriteFailure)?
        };

        debug!(
            "Cascaded {} fields from {} {} to {} {} via `{}`",
            patch.len(),
            source.schema,
            source.id,
            patched,
            dependent_schema,
            inverse.name
        );
        Ok(patched)
    }

    /// Filter matching the dependents that currently reference `source`.
    fn dependents_of(&self, source: &Document) -> Filter {
        let reference = self.directive.reference();
        let filter = Filter::new().eq(&reference.foreign_key, Value::from(source.id));
        match reference.type_key() {
            Some(type_key) => filter.eq(&type_key, source.schema.as_str()),
            None => filter,
        }
    }
}
