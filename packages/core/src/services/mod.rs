//! Business Services
//!
//! This module contains the catalog's business logic services:
//!
//! - `ImportService` - Level-ordered bulk import with dry-run mode
//! - `BatchEditService` - Concurrent batch edits with per-field conflicts
//! - `ClosureProcessor` - Background task maintaining the closure table
//! - `MaintenanceService` - Hierarchy verification and guarded delete
//! - `CacheMaterializer` - Once-per-batch rewarm of the hierarchical listing
//! - `LanguoidCatalog` - All of the above wired over one store
//!
//! Services coordinate between the store and the hierarchy algorithms,
//! implementing business rules and scheduling follow-up work.

pub mod batch_edit_service;
pub mod cache;
pub mod catalog;
pub mod closure_processor;
pub mod error;
pub mod export;
pub mod import_service;
pub mod maintenance;

pub use batch_edit_service::{
    AppliedRow, BatchEditRequest, BatchEditResponse, BatchEditService, BatchRow, FieldConflict,
    RowConflict,
};
pub use cache::{CacheMaterializer, CacheService, InMemoryCache, HIERARCHICAL_LISTING_KEY};
pub use catalog::LanguoidCatalog;
pub use closure_processor::{
    ClosureJob, ClosureProcessor, ClosureProcessorHandle, JobPriority, JobScheduler,
    RecordingScheduler,
};
pub use error::{BatchRowError, ImportProblem, LanguoidServiceError, RowKey};
pub use export::{hierarchical_listing, sort_hierarchically, ListingEntry};
pub use import_service::{ImportService, ImportSummary};
pub use maintenance::{DanglingReference, HierarchyReport, MaintenanceService, ParentMismatch};
