//! Hierarchy algorithms
//!
//! Pure, store-independent building blocks used by the import and batch-edit
//! services:
//!
//! - `identity` - match incoming records to existing languoids
//! - `pseudo_code` - placeholder codes for records without one
//! - `cycle` - cycle detection over a parent mapping
//! - `closure` - descendant sets and ancestor walks over an arena index

pub mod closure;
pub mod cycle;
pub mod identity;
pub mod pseudo_code;

pub use closure::{ClosureBuilder, ClosureTable, HierarchyIndex};
pub use cycle::{CycleReport, CycleValidator};
pub use identity::{AmbiguityReason, IdentityIndex, IdentityMatch, MatchedBy};
pub use pseudo_code::{
    assign_pseudo_codes, PseudoAssignment, PseudoCodeError, PseudoCodeGenerator,
    PseudoCodeOutcome, UsedCodes, DEFAULT_FALLBACK_PREFIX, PSEUDO_SUFFIX_START,
};
