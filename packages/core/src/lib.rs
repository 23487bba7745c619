//! Languoid Catalog Core
//!
//! This crate maintains a catalog of languoids (language families, subgroups,
//! languages and dialects) as a forest, keeps its materialized descendant
//! sets current, and reconciles it against external datasets.
//!
//! # Architecture
//!
//! - **Typed ancestor slots**: each languoid names its family, subgroups and
//!   enclosing language; the single tree edge `parent_ref` is derived from
//!   those slots and the languoid's level
//! - **Closure table**: descendant sets are materialized off the request path
//!   by a coalescing background processor
//! - **Atomic writes**: imports and batch edits run in one store transaction
//!   and either commit fully or leave no trace
//!
//! # Modules
//!
//! - [`models`] - Data structures (Languoid, ImportRecord, LanguoidField, etc.)
//! - [`hierarchy`] - Identity matching, placeholder codes, cycle detection, closures
//! - [`services`] - Import, batch edit, closure processing, maintenance
//! - [`db`] - Transactional in-memory store and domain events
//! - [`config`] - Service tunables

pub mod config;
pub mod db;
pub mod hierarchy;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::CatalogConfig;
pub use models::*;
pub use services::*;
