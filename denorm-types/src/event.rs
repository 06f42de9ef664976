//! Lifecycle events raised by the persistence framework.
//!
//! The framework notifies observers at fixed points around a write. Events
//! before the write may mutate the document being saved; events after it
//! see the committed state together with the changes that were written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in a document's save/update lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Before validation runs (first event of every save).
    #[serde(alias = "BeforeValidate")]
    BeforeValidate,
    /// Before a create or an update is written.
    #[serde(alias = "BeforeSave")]
    BeforeSave,
    /// Before a new document is inserted.
    #[serde(alias = "BeforeCreate")]
    BeforeCreate,
    /// Before an existing document is rewritten.
    #[serde(alias = "BeforeUpdate")]
    BeforeUpdate,
    /// After a new document was inserted.
    #[serde(alias = "AfterCreate")]
    AfterCreate,
    /// After an existing document's update was committed.
    #[serde(alias = "AfterUpdate")]
    AfterUpdate,
    /// After any save was committed.
    #[serde(alias = "AfterSave")]
    AfterSave,
}

impl LifecycleEvent {
    /// All events, in the order a create-or-update save raises them.
    pub const ALL: [LifecycleEvent; 7] = [
        Self::BeforeValidate,
        Self::BeforeSave,
        Self::BeforeCreate,
        Self::BeforeUpdate,
        Self::AfterCreate,
        Self::AfterUpdate,
        Self::AfterSave,
    ];

    /// Returns true for events raised before the document is written, where
    /// in-memory mutations are still persisted by the triggering save.
    #[must_use]
    pub const fn is_before_persist(self) -> bool {
        matches!(
            self,
            Self::BeforeValidate | Self::BeforeSave | Self::BeforeCreate | Self::BeforeUpdate
        )
    }

    /// The snake_case name used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeValidate => "before_validate",
            Self::BeforeSave => "before_save",
            Self::BeforeCreate => "before_create",
            Self::BeforeUpdate => "before_update",
            Self::AfterCreate => "after_create",
            Self::AfterUpdate => "after_update",
            Self::AfterSave => "after_save",
        }
    }
}

impl Default for LifecycleEvent {
    fn default() -> Self {
        Self::BeforeSave
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleEvent {
    type Err = crate::Error;

    /// Accepts both `before_save` and `BeforeSave` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|event| event.as_str().replace('_', "") == normalized)
            .ok_or_else(|| crate::Error::UnknownLifecycleEvent(s.to_string()))
    }
}
