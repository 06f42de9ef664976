//! Lifecycle driver: runs saves through the store and notifies observers.
//!
//! A create raises
//! `BeforeValidate → BeforeSave → BeforeCreate → (insert) → AfterCreate → AfterSave`,
//! a save of a persisted document raises
//! `BeforeValidate → BeforeSave → BeforeUpdate → (patch) → AfterUpdate → AfterSave`.
//! Before-events may mutate the document and the mutation is written by the
//! same save. An update writes only the fields the document changed, so
//! fields written meanwhile by other saves (a cascade, say) survive a save
//! of a stale copy. After-events still see the pre-save snapshot, so
//! [`Document::changed`] reports what the write changed.

use std::sync::Arc;

use denorm_model::Document;
use denorm_types::{DocumentId, LifecycleEvent};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{HookError, StorageError, StorageResult};
use crate::query::Patch;
use crate::store::DocumentStore;

/// Receives lifecycle notifications for every document the repository saves.
///
/// Returning an error aborts the save: errors from before-events prevent the
/// write, errors from after-events surface to the caller after the write
/// was committed.
pub trait LifecycleObserver: Send + Sync {
    fn notify(
        &self,
        event: LifecycleEvent,
        document: &mut Document,
        store: &dyn DocumentStore,
    ) -> Result<(), HookError>;
}

/// Saves documents through a [`DocumentStore`], raising lifecycle events.
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            observers: Vec::new(),
        }
    }

    /// Adds an observer; observers are notified in registration order.
    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn notify(&self, event: LifecycleEvent, document: &mut Document) -> StorageResult<()> {
        for observer in &self.observers {
            observer
                .notify(event, document, self.store.as_ref())
                .map_err(StorageError::Hook)?;
        }
        Ok(())
    }

    /// Inserts a new document.
    pub fn create(&self, document: &mut Document) -> StorageResult<()> {
        if !document.is_new() {
            return Err(StorageError::AlreadyExists(document.id.to_string()));
        }

        self.notify(LifecycleEvent::BeforeValidate, document)?;
        self.notify(LifecycleEvent::BeforeSave, document)?;
        self.notify(LifecycleEvent::BeforeCreate, document)?;

        let now = chrono::Utc::now().timestamp_millis();
        document.created_at = now;
        document.modified_at = now;
        self.store.insert(document)?;

        self.notify(LifecycleEvent::AfterCreate, document)?;
        self.notify(LifecycleEvent::AfterSave, document)?;
        document.mark_persisted();
        Ok(())
    }

    /// Creates a new document or writes the changes of a persisted one.
    ///
    /// A persisted document without changes raises the same events but is
    /// not rewritten. A removed field is written as `null`.
    pub fn save(&self, document: &mut Document) -> StorageResult<()> {
        if document.is_new() {
            return self.create(document);
        }

        self.notify(LifecycleEvent::BeforeValidate, document)?;
        self.notify(LifecycleEvent::BeforeSave, document)?;
        self.notify(LifecycleEvent::BeforeUpdate, document)?;

        let patch = changes_patch(document);
        if !patch.is_empty() {
            document.modified_at = chrono::Utc::now().timestamp_millis();
            if !self.store.update_one(&document.schema, document.id, &patch)? {
                return Err(StorageError::NotFound(document.id.to_string()));
            }
        } else {
            debug!("Skipping write of unchanged {} {}", document.schema, document.id);
        }

        self.notify(LifecycleEvent::AfterUpdate, document)?;
        self.notify(LifecycleEvent::AfterSave, document)?;
        document.mark_persisted();
        Ok(())
    }

    /// Assigns `attributes` and saves.
    pub fn update_attributes(
        &self,
        document: &mut Document,
        attributes: Map<String, Value>,
    ) -> StorageResult<()> {
        document.data.extend(attributes);
        self.save(document)
    }

    pub fn find(&self, schema: &str, id: DocumentId) -> StorageResult<Option<Document>> {
        self.store.find(schema, id)
    }

    /// Re-reads a document, discarding unsaved changes.
    pub fn reload(&self, document: &Document) -> StorageResult<Document> {
        self.store
            .find(&document.schema, document.id)?
            .ok_or_else(|| StorageError::NotFound(document.id.to_string()))
    }
}

/// Changed fields of `document` with their current values.
fn changes_patch(document: &Document) -> Patch {
    document
        .changed_fields()
        .into_iter()
        .map(|field| {
            let value = document.get(field).cloned().unwrap_or(Value::Null);
            (field.to_string(), value)
        })
        .collect()
}
