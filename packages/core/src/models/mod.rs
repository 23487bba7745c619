//! Data Models
//!
//! This module contains the core data structures of the languoid catalog:
//!
//! - `Languoid` - a node of the taxonomy forest, with its typed ancestor slots
//! - `ImportRecord` - one row of the external dataset consumed by bulk import
//! - `LanguoidField` - the editable columns addressed by the batch editor
//! - `Versioned` - values tagged with the version they were read at

mod field;
mod import_record;
mod languoid;
mod versioned;

pub use field::LanguoidField;
pub use import_record::{is_no_code_sentinel, ImportRecord, NO_CODE_SENTINEL_PREFIX};
pub use languoid::{
    is_valid_code, CoarseLevel, Languoid, LanguoidDraft, LanguoidId, LanguoidLevel, ParentSlot,
    SlotRefs, ValidationError, CODE_LENGTH, MAX_ALT_NAMES_LENGTH, MAX_MODIFIED_BY_LENGTH,
    MAX_NAME_LENGTH, MAX_NOTES_LENGTH, MAX_REGION_LENGTH, MAX_TRIBES_LENGTH,
};
pub use versioned::{resolve_field, FieldResolution, Versioned};
