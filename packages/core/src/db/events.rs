//! Domain Events for LanguoidStore
//!
//! This module defines the domain events emitted by `LanguoidStore` when data
//! changes. Other parts of the system (cache materialization, UI push) can
//! subscribe without coupling to the store implementation.
//!
//! # Event Flow
//!
//! 1. A `StoreTransaction` stages creates, updates and deletes
//! 2. On commit, the staged events are emitted via a broadcast channel
//! 3. A rolled-back transaction emits nothing
//!
//! Closure rebuilds are written outside edit transactions and emit a single
//! `ClosuresRebuilt` event per write.

use crate::models::{Languoid, LanguoidId};
use serde::Serialize;

/// Domain events emitted by `LanguoidStore`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A new languoid was created
    LanguoidCreated { languoid: Languoid },

    /// An existing languoid was updated
    LanguoidUpdated { languoid: Languoid },

    /// A languoid was deleted
    LanguoidDeleted { id: LanguoidId },

    /// Descendant sets were recomputed for `count` languoids
    ClosuresRebuilt { count: usize, full: bool },
}

impl DomainEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::LanguoidCreated { .. } => "languoid:created",
            DomainEvent::LanguoidUpdated { .. } => "languoid:updated",
            DomainEvent::LanguoidDeleted { .. } => "languoid:deleted",
            DomainEvent::ClosuresRebuilt { .. } => "closure:rebuilt",
        }
    }
}
