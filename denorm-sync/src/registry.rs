//! Hook registry: ordered callbacks per (schema, lifecycle event).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use denorm_model::Document;
use denorm_storage::DocumentStore;
use denorm_types::LifecycleEvent;

use crate::error::SyncResult;

/// A callback invoked with the document being saved and the store.
pub type HookFn = Arc<dyn Fn(&mut Document, &dyn DocumentStore) -> SyncResult<()> + Send + Sync>;

struct RegisteredHook {
    label: String,
    callback: HookFn,
}

/// Callbacks keyed by schema name, then by event, in registration order.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<String, HashMap<LifecycleEvent, Vec<RegisteredHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, schema: &str, event: LifecycleEvent, label: impl Into<String>, callback: F)
    where
        F: Fn(&mut Document, &dyn DocumentStore) -> SyncResult<()> + Send + Sync + 'static,
    {
        self.hooks
            .entry(schema.to_string())
            .or_default()
            .entry(event)
            .or_default()
            .push(RegisteredHook {
                label: label.into(),
                callback: Arc::new(callback),
            });
    }

    /// Labels of the hooks registered for `schema` at `event`, in order.
    pub fn labels(&self, schema: &str, event: LifecycleEvent) -> Vec<&str> {
        self.hooks_for(schema, event)
            .iter()
            .map(|h| h.label.as_str())
            .collect()
    }

    /// Total number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn hooks_for(&self, schema: &str, event: LifecycleEvent) -> &[RegisteredHook] {
        self.hooks
            .get(schema)
            .and_then(|by_event| by_event.get(&event))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Runs the hooks registered for the document's schema at `event`,
    /// stopping at the first error.
    pub fn dispatch(
        &self,
        event: LifecycleEvent,
        document: &mut Document,
        store: &dyn DocumentStore,
    ) -> SyncResult<()> {
        let hooks = self.hooks_for(&document.schema, event);
        for hook in hooks {
            (hook.callback)(document, store)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (schema, by_event) in &self.hooks {
            for (event, hooks) in by_event {
                let labels: Vec<&str> = hooks.iter().map(|h| h.label.as_str()).collect();
                map.entry(&format_args!("{schema}/{event}"), &labels);
            }
        }
        map.finish()
    }
}
