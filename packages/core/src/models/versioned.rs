//! Versioned values and field-level conflict resolution
//!
//! Optimistic concurrency in the batch editor is decided per field, not per
//! row. A client submits the value it wants, the value it originally loaded,
//! and the `updated_at` it saw. `resolve_field` compares those against the
//! stored value and its version:
//!
//! - client saw the current version (or newer): apply
//! - stored value already equals the attempted value: nothing to do
//! - stored value still equals what the client loaded: apply
//! - otherwise another editor changed this field: conflict
//!
//! The function is pure so the rule can be tested without a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value paired with the version marker it was read at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<V> {
    pub value: V,
    pub version: DateTime<Utc>,
}

impl<V> Versioned<V> {
    pub fn new(value: V, version: DateTime<Utc>) -> Self {
        Self { value, version }
    }
}

/// Outcome of resolving one field of an update
#[derive(Debug, Clone, PartialEq)]
pub enum FieldResolution<V> {
    /// Write the attempted value
    Apply(V),

    /// Stored value already matches the attempt
    Unchanged,

    /// Another editor changed the field after the client loaded it
    Conflict {
        stored: V,
        original: Option<V>,
        attempted: V,
    },
}

impl<V> FieldResolution<V> {
    pub fn is_conflict(&self) -> bool {
        matches!(self, FieldResolution::Conflict { .. })
    }
}

/// Decide whether an attempted field change may be applied
///
/// `original` is the value the client loaded before editing. When the stored
/// row is newer and the client sent no original for the field, the change is
/// treated as a conflict, since it cannot be shown to be safe.
pub fn resolve_field<V: PartialEq + Clone>(
    stored: &Versioned<V>,
    client_seen: DateTime<Utc>,
    original: Option<&V>,
    attempted: V,
) -> FieldResolution<V> {
    if attempted == stored.value {
        return FieldResolution::Unchanged;
    }

    if client_seen >= stored.version {
        return FieldResolution::Apply(attempted);
    }

    match original {
        Some(loaded) if *loaded == stored.value => FieldResolution::Apply(attempted),
        _ => FieldResolution::Conflict {
            stored: stored.value.clone(),
            original: original.cloned(),
            attempted,
        },
    }
}
