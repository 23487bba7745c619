//! Bulk-import records
//!
//! One `ImportRecord` is one row of the external authoritative dataset.
//! References to other languoids are expressed as codes; records without a
//! real code carry a "no code" sentinel until placeholder codes are assigned.

use crate::models::languoid::{
    check_coordinate, check_length, check_optional_length, is_valid_code, LanguoidLevel,
    ParentSlot, SlotRefs, ValidationError, MAX_ALT_NAMES_LENGTH, MAX_NAME_LENGTH,
    MAX_NOTES_LENGTH, MAX_REGION_LENGTH, MAX_TRIBES_LENGTH,
};
use serde::{Deserialize, Serialize};

/// Prefix marking a code as "no code yet" (e.g. `nocode0001`)
pub const NO_CODE_SENTINEL_PREFIX: &str = "nocode";

/// Whether a code value means "this record has no real code"
///
/// Empty values and anything starting with `nocode` (case-insensitive) are
/// sentinels. Empty sentinels cannot be referenced by other records.
pub fn is_no_code_sentinel(code: &str) -> bool {
    let trimmed = code.trim();
    trimmed.is_empty()
        || trimmed
            .to_ascii_lowercase()
            .starts_with(NO_CODE_SENTINEL_PREFIX)
}

/// One record of the external dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub code: String,

    pub name: String,

    pub level: LanguoidLevel,

    #[serde(default)]
    pub family_code: String,

    #[serde(default)]
    pub primary_subgroup_code: String,

    #[serde(default)]
    pub secondary_subgroup_code: String,

    /// Enclosing language of a dialect
    #[serde(default)]
    pub language_code: String,

    #[serde(default)]
    pub alt_names: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub tribes: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl ImportRecord {
    /// Record with the required fields set and everything else empty
    pub fn new(code: impl Into<String>, name: impl Into<String>, level: LanguoidLevel) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            level,
            family_code: String::new(),
            primary_subgroup_code: String::new(),
            secondary_subgroup_code: String::new(),
            language_code: String::new(),
            alt_names: None,
            region: None,
            latitude: None,
            longitude: None,
            tribes: None,
            notes: None,
        }
    }

    pub fn with_reference(mut self, slot: ParentSlot, code: impl Into<String>) -> Self {
        *self.reference_mut(slot) = code.into();
        self
    }

    pub fn has_sentinel_code(&self) -> bool {
        is_no_code_sentinel(&self.code)
    }

    /// Referenced code in a slot, if non-empty
    pub fn reference(&self, slot: ParentSlot) -> Option<&str> {
        let raw = match slot {
            ParentSlot::Family => &self.family_code,
            ParentSlot::PrimarySubgroup => &self.primary_subgroup_code,
            ParentSlot::SecondarySubgroup => &self.secondary_subgroup_code,
            ParentSlot::Language => &self.language_code,
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn reference_mut(&mut self, slot: ParentSlot) -> &mut String {
        match slot {
            ParentSlot::Family => &mut self.family_code,
            ParentSlot::PrimarySubgroup => &mut self.primary_subgroup_code,
            ParentSlot::SecondarySubgroup => &mut self.secondary_subgroup_code,
            ParentSlot::Language => &mut self.language_code,
        }
    }

    /// All non-empty references, keyed by slot
    pub fn references(&self) -> SlotRefs<String> {
        SlotRefs {
            family: self.reference(ParentSlot::Family).map(str::to_string),
            primary_subgroup: self
                .reference(ParentSlot::PrimarySubgroup)
                .map(str::to_string),
            secondary_subgroup: self
                .reference(ParentSlot::SecondarySubgroup)
                .map(str::to_string),
            language: self.reference(ParentSlot::Language).map(str::to_string),
        }
    }

    /// Code of the effective parent under the fixed parent rule
    pub fn parent_code(&self) -> Option<String> {
        self.level.compute_parent(&self.references())
    }

    /// Short description used in diagnostics
    pub fn describe(&self) -> String {
        if self.code.trim().is_empty() {
            format!("'{}'", self.name)
        } else {
            format!("'{}' [{}]", self.name, self.code.trim())
        }
    }

    /// Collect every field-level problem of this record
    ///
    /// Runs after placeholder assignment, so a sentinel code still present
    /// here is reported as malformed.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError::MissingField("name".to_string()));
        }
        let checks = [
            check_length("name", &self.name, MAX_NAME_LENGTH),
            check_optional_length("alt_names", self.alt_names.as_deref(), MAX_ALT_NAMES_LENGTH),
            check_optional_length("region", self.region.as_deref(), MAX_REGION_LENGTH),
            check_optional_length("tribes", self.tribes.as_deref(), MAX_TRIBES_LENGTH),
            check_optional_length("notes", self.notes.as_deref(), MAX_NOTES_LENGTH),
            check_coordinate("latitude", self.latitude, 90.0),
            check_coordinate("longitude", self.longitude, 180.0),
        ];
        errors.extend(checks.into_iter().filter_map(Result::err));

        let code = self.code.trim();
        if !is_valid_code(code) {
            errors.push(ValidationError::InvalidCode(code.to_string()));
        }

        for slot in ParentSlot::ALL {
            if let Some(reference) = self.reference(slot) {
                if reference == code {
                    errors.push(ValidationError::invalid_value(
                        format!("{}_code", slot.as_str()),
                        "record references itself",
                    ));
                }
            }
        }

        errors
    }
}
