//! Database Layer
//!
//! This module handles all persistence for the languoid catalog:
//!
//! - `LanguoidStore` - transactional languoid table plus the closure table
//! - `StoreTransaction` - staged writes, committed atomically or rolled back
//! - `DomainEvent` - change notifications broadcast after commit
//!
//! # Architecture
//!
//! The production deployment keeps languoids in a relational database; the
//! engine only needs a transactional key/relation store with unique codes and
//! monotonic version stamps, which `LanguoidStore` provides in memory.

mod error;
pub mod events;
mod store;

pub use error::DatabaseError;
pub use events::DomainEvent;
pub use store::{LanguoidStore, StoreTransaction};
