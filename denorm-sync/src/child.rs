//! Pull side: copies mirrored fields from the referenced source into the
//! dependent while the dependent is being saved.

use std::sync::Arc;

use denorm_model::Document;
use denorm_storage::DocumentStore;
use tracing::{debug, warn};

use crate::directive::{SourceBinding, SyncDirective};
use crate::error::{SyncError, SyncResult};

/// Registered on the dependent schema at the directive's trigger event.
#[derive(Debug, Clone)]
pub struct ChildSyncHook {
    directive: Arc<SyncDirective>,
}

impl ChildSyncHook {
    pub fn new(directive: Arc<SyncDirective>) -> Self {
        Self { directive }
    }

    pub fn directive(&self) -> &Arc<SyncDirective> {
        &self.directive
    }

    /// Pulls the mapped fields when the reference changed (or the new
    /// dependent was created with one). Returns how many fields were written.
    ///
    /// A cleared reference leaves the mirrored fields as they are.
    pub fn pull(&self, dependent: &mut Document, store: &dyn DocumentStore) -> SyncResult<usize> {
        let reference = self.directive.reference();
        let type_changed = reference
            .type_key()
            .is_some_and(|key| dependent.changed(&key));
        if !dependent.changed(&reference.foreign_key) && !type_changed {
            return Ok(0);
        }

        let Some(source_id) = dependent.reference_id(reference) else {
            return Ok(0);
        };

        let Some(binding) = self.binding_for(dependent) else {
            debug!(
                "{} {} references a schema outside `{}` sources, skipping pull",
                dependent.schema, dependent.id, reference.name
            );
            return Ok(0);
        };

        let source = store
            .find(&binding.schema().name, source_id)
            .map_err(SyncError::CollaboratorReadFailure)?;
        let Some(source) = source else {
            warn!(
                "{} {} references missing {} {}",
                dependent.schema,
                dependent.id,
                binding.schema().name,
                source_id
            );
            return Ok(0);
        };

        let mut pulled = 0;
        for mapping in binding.mappings() {
            // Heterogeneous sources may leave a declared field unset.
            let Some(value) = source.get(&mapping.source_field) else {
                continue;
            };
            dependent.set(&mapping.dependent_field, value.clone());
            pulled += 1;
        }

        debug!(
            "Pulled {} fields from {} {} into {} {}",
            pulled, source.schema, source.id, dependent.schema, dependent.id
        );
        Ok(pulled)
    }

    fn binding_for(&self, dependent: &Document) -> Option<&SourceBinding> {
        match self.directive.reference().type_key() {
            Some(type_key) => dependent
                .get_str(&type_key)
                .and_then(|schema| self.directive.source(schema)),
            None => self.directive.sources().first(),
        }
    }
}
