//! Languoid Data Structures
//!
//! This module defines the `Languoid` taxonomy node and the small closed types
//! that drive the hierarchy algorithms:
//!
//! - `LanguoidLevel` - fine-grained taxonomy level (family → dialect)
//! - `CoarseLevel` - the three-way classification used for collapsing
//! - `ParentSlot` / `SlotRefs` - the typed ancestor-reference slots and the
//!   fixed rule that derives a node's single effective parent from them
//!
//! # Parent Rule
//!
//! | Level           | Effective parent                                   |
//! |-----------------|----------------------------------------------------|
//! | `family`        | none                                               |
//! | `subfamily`     | family slot                                        |
//! | `sub-subfamily` | primary-subgroup slot                              |
//! | `language`      | first present of secondary, primary, family        |
//! | `dialect`       | enclosing-language slot                            |
//!
//! The rule is exhaustive over `LanguoidLevel`, so adding a level fails to
//! compile until the rule covers it.
//!
//! # Examples
//!
//! ```rust
//! use languoid_core::models::{LanguoidLevel, SlotRefs};
//!
//! let refs = SlotRefs {
//!     family: Some(1),
//!     primary_subgroup: Some(2),
//!     secondary_subgroup: None,
//!     language: None,
//! };
//! assert_eq!(LanguoidLevel::Language.compute_parent(&refs), Some(2));
//! assert_eq!(LanguoidLevel::Subfamily.compute_parent(&refs), Some(1));
//! assert_eq!(LanguoidLevel::Family.compute_parent(&refs), None);
//! ```

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Length of an external glottocode (4 alphanumerics + 4 digits)
pub const CODE_LENGTH: usize = 8;

/// Maximum length of a languoid display name
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of the alternative-names field
pub const MAX_ALT_NAMES_LENGTH: usize = 2048;

/// Maximum length of the region field
pub const MAX_REGION_LENGTH: usize = 255;

/// Maximum length of the tribes field
pub const MAX_TRIBES_LENGTH: usize = 2048;

/// Maximum length of the notes field
pub const MAX_NOTES_LENGTH: usize = 4096;

/// Maximum length of the `modified_by` audit field
pub const MAX_MODIFIED_BY_LENGTH: usize = 150;

// Glottocode pattern: four lowercase alphanumerics followed by four digits
const CODE_PATTERN: &str = r"^[a-z0-9]{4}[0-9]{4}$";

fn code_regex() -> &'static Regex {
    static CODE_REGEX: OnceLock<Regex> = OnceLock::new();
    CODE_REGEX.get_or_init(|| Regex::new(CODE_PATTERN).expect("code pattern is a valid regex"))
}

/// Check whether a string is a well-formed glottocode
///
/// ```rust
/// # use languoid_core::models::is_valid_code;
/// assert!(is_valid_code("stan1293"));
/// assert!(!is_valid_code("Stan1293"));
/// assert!(!is_valid_code("stan12"));
/// ```
pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code_regex().is_match(code)
}

/// Validation errors for languoid fields and import records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field '{field}' is too long: {actual} characters (max {max})")]
    FieldTooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("Invalid code '{0}': expected 4 lowercase alphanumerics followed by 4 digits")]
    InvalidCode(String),

    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    #[error("Field '{field}' has an out-of-range coordinate: {value}")]
    InvalidCoordinate { field: String, value: f64 },

    #[error("Invalid value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Languoid {id} cannot reference itself as {slot}")]
    SelfReference { id: LanguoidId, slot: String },
}

impl ValidationError {
    /// Create a field-too-long error
    pub fn too_long(field: impl Into<String>, max: usize, actual: usize) -> Self {
        Self::FieldTooLong {
            field: field.into(),
            max,
            actual,
        }
    }

    /// Create an invalid-field-value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Stable internal surrogate key, assigned by the store and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguoidId(pub i64);

impl fmt::Display for LanguoidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fine-grained taxonomy level
///
/// Declaration order is the order in which bulk import processes records,
/// so every ancestor level is written before the levels that reference it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LanguoidLevel {
    Family,
    Subfamily,
    SubSubfamily,
    Language,
    Dialect,
}

/// Coarse classification derived from the fine level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoarseLevel {
    Family,
    Language,
    Dialect,
}

/// One of the typed ancestor-reference slots on a languoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentSlot {
    Family,
    PrimarySubgroup,
    SecondarySubgroup,
    Language,
}

impl ParentSlot {
    /// All slots, in a stable order
    pub const ALL: [ParentSlot; 4] = [
        ParentSlot::Family,
        ParentSlot::PrimarySubgroup,
        ParentSlot::SecondarySubgroup,
        ParentSlot::Language,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParentSlot::Family => "family",
            ParentSlot::PrimarySubgroup => "primary_subgroup",
            ParentSlot::SecondarySubgroup => "secondary_subgroup",
            ParentSlot::Language => "language",
        }
    }
}

impl fmt::Display for ParentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values held in the four ancestor-reference slots
///
/// Generic so the same parent rule runs over stored ids and over the
/// code-keyed references of a pending import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRefs<T> {
    pub family: Option<T>,
    pub primary_subgroup: Option<T>,
    pub secondary_subgroup: Option<T>,
    pub language: Option<T>,
}

// Derived `Default` would require `T: Default`
impl<T> Default for SlotRefs<T> {
    fn default() -> Self {
        Self {
            family: None,
            primary_subgroup: None,
            secondary_subgroup: None,
            language: None,
        }
    }
}

impl<T> SlotRefs<T> {
    pub fn get(&self, slot: ParentSlot) -> Option<&T> {
        match slot {
            ParentSlot::Family => self.family.as_ref(),
            ParentSlot::PrimarySubgroup => self.primary_subgroup.as_ref(),
            ParentSlot::SecondarySubgroup => self.secondary_subgroup.as_ref(),
            ParentSlot::Language => self.language.as_ref(),
        }
    }

    /// Map every present reference through `f`, keeping slot positions
    pub fn map<U>(self, mut f: impl FnMut(T) -> Option<U>) -> SlotRefs<U> {
        SlotRefs {
            family: self.family.and_then(&mut f),
            primary_subgroup: self.primary_subgroup.and_then(&mut f),
            secondary_subgroup: self.secondary_subgroup.and_then(&mut f),
            language: self.language.and_then(&mut f),
        }
    }
}

impl LanguoidLevel {
    /// All levels in import processing order
    pub const ALL: [LanguoidLevel; 5] = [
        LanguoidLevel::Family,
        LanguoidLevel::Subfamily,
        LanguoidLevel::SubSubfamily,
        LanguoidLevel::Language,
        LanguoidLevel::Dialect,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LanguoidLevel::Family => "family",
            LanguoidLevel::Subfamily => "subfamily",
            LanguoidLevel::SubSubfamily => "sub-subfamily",
            LanguoidLevel::Language => "language",
            LanguoidLevel::Dialect => "dialect",
        }
    }

    /// Coarse level used for UI collapsing
    pub fn coarse(self) -> CoarseLevel {
        match self {
            LanguoidLevel::Family | LanguoidLevel::Subfamily | LanguoidLevel::SubSubfamily => {
                CoarseLevel::Family
            }
            LanguoidLevel::Language => CoarseLevel::Language,
            LanguoidLevel::Dialect => CoarseLevel::Dialect,
        }
    }

    /// Slots consulted for the effective parent, in priority order
    pub fn parent_slots(self) -> &'static [ParentSlot] {
        match self {
            LanguoidLevel::Family => &[],
            LanguoidLevel::Subfamily => &[ParentSlot::Family],
            LanguoidLevel::SubSubfamily => &[ParentSlot::PrimarySubgroup],
            LanguoidLevel::Language => &[
                ParentSlot::SecondarySubgroup,
                ParentSlot::PrimarySubgroup,
                ParentSlot::Family,
            ],
            LanguoidLevel::Dialect => &[ParentSlot::Language],
        }
    }

    /// Derive the single effective parent from the slot values
    pub fn compute_parent<T: Clone>(self, refs: &SlotRefs<T>) -> Option<T> {
        self.parent_slots()
            .iter()
            .find_map(|slot| refs.get(*slot).cloned())
    }
}

impl fmt::Display for LanguoidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguoidLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "family" => Ok(LanguoidLevel::Family),
            "subfamily" => Ok(LanguoidLevel::Subfamily),
            "sub-subfamily" | "subsubfamily" => Ok(LanguoidLevel::SubSubfamily),
            "language" => Ok(LanguoidLevel::Language),
            "dialect" => Ok(LanguoidLevel::Dialect),
            other => Err(ValidationError::InvalidLevel(other.to_string())),
        }
    }
}

/// Editable content of a languoid, used when inserting a new node
///
/// The store assigns `id` and `updated_at` and derives `parent_ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguoidDraft {
    pub code: Option<String>,
    pub name: String,
    pub level: LanguoidLevel,
    pub family_ref: Option<LanguoidId>,
    pub primary_subgroup_ref: Option<LanguoidId>,
    pub secondary_subgroup_ref: Option<LanguoidId>,
    pub language_ref: Option<LanguoidId>,
    pub alt_names: Option<String>,
    pub region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tribes: Option<String>,
    pub notes: Option<String>,
    pub modified_by: Option<String>,
}

impl LanguoidDraft {
    /// Draft with only the required fields set
    pub fn new(name: impl Into<String>, level: LanguoidLevel) -> Self {
        Self {
            code: None,
            name: name.into(),
            level,
            family_ref: None,
            primary_subgroup_ref: None,
            secondary_subgroup_ref: None,
            language_ref: None,
            alt_names: None,
            region: None,
            latitude: None,
            longitude: None,
            tribes: None,
            notes: None,
            modified_by: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_ref(mut self, slot: ParentSlot, target: LanguoidId) -> Self {
        match slot {
            ParentSlot::Family => self.family_ref = Some(target),
            ParentSlot::PrimarySubgroup => self.primary_subgroup_ref = Some(target),
            ParentSlot::SecondarySubgroup => self.secondary_subgroup_ref = Some(target),
            ParentSlot::Language => self.language_ref = Some(target),
        }
        self
    }

    /// Materialize the draft as a stored languoid
    pub fn into_languoid(self, id: LanguoidId, updated_at: DateTime<Utc>) -> Languoid {
        let mut languoid = Languoid {
            id,
            code: self.code,
            name: self.name,
            level: self.level,
            family_ref: self.family_ref,
            primary_subgroup_ref: self.primary_subgroup_ref,
            secondary_subgroup_ref: self.secondary_subgroup_ref,
            language_ref: self.language_ref,
            parent_ref: None,
            alt_names: self.alt_names,
            region: self.region,
            latitude: self.latitude,
            longitude: self.longitude,
            tribes: self.tribes,
            notes: self.notes,
            updated_at,
            modified_by: self.modified_by,
        };
        languoid.recompute_parent();
        languoid
    }
}

/// A node in the language taxonomy forest
///
/// # Fields
///
/// - `id`: store-assigned surrogate key
/// - `code`: external glottocode, unique when present
/// - `level`: fine level; the coarse level is derived via [`Languoid::coarse_level`]
/// - `family_ref` .. `language_ref`: typed ancestor-reference slots
/// - `parent_ref`: the computed effective parent, the only edge of the forest
/// - `updated_at`: optimistic-concurrency version marker
///
/// The materialized descendant set lives in the store's closure table,
/// not on the node, so rebuilding it never bumps `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Languoid {
    pub id: LanguoidId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub name: String,

    pub level: LanguoidLevel,

    #[serde(default)]
    pub family_ref: Option<LanguoidId>,

    #[serde(default)]
    pub primary_subgroup_ref: Option<LanguoidId>,

    #[serde(default)]
    pub secondary_subgroup_ref: Option<LanguoidId>,

    /// Enclosing language, consulted only for dialects
    #[serde(default)]
    pub language_ref: Option<LanguoidId>,

    /// Computed effective parent (see module docs)
    #[serde(default)]
    pub parent_ref: Option<LanguoidId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_names: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tribes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
}

impl From<Languoid> for LanguoidDraft {
    fn from(languoid: Languoid) -> Self {
        Self {
            code: languoid.code,
            name: languoid.name,
            level: languoid.level,
            family_ref: languoid.family_ref,
            primary_subgroup_ref: languoid.primary_subgroup_ref,
            secondary_subgroup_ref: languoid.secondary_subgroup_ref,
            language_ref: languoid.language_ref,
            alt_names: languoid.alt_names,
            region: languoid.region,
            latitude: languoid.latitude,
            longitude: languoid.longitude,
            tribes: languoid.tribes,
            notes: languoid.notes,
            modified_by: languoid.modified_by,
        }
    }
}

impl Languoid {
    pub fn coarse_level(&self) -> CoarseLevel {
        self.level.coarse()
    }

    /// Current values of the ancestor-reference slots
    pub fn refs(&self) -> SlotRefs<LanguoidId> {
        SlotRefs {
            family: self.family_ref,
            primary_subgroup: self.primary_subgroup_ref,
            secondary_subgroup: self.secondary_subgroup_ref,
            language: self.language_ref,
        }
    }

    pub fn slot(&self, slot: ParentSlot) -> Option<LanguoidId> {
        match slot {
            ParentSlot::Family => self.family_ref,
            ParentSlot::PrimarySubgroup => self.primary_subgroup_ref,
            ParentSlot::SecondarySubgroup => self.secondary_subgroup_ref,
            ParentSlot::Language => self.language_ref,
        }
    }

    pub fn set_slot(&mut self, slot: ParentSlot, target: Option<LanguoidId>) {
        match slot {
            ParentSlot::Family => self.family_ref = target,
            ParentSlot::PrimarySubgroup => self.primary_subgroup_ref = target,
            ParentSlot::SecondarySubgroup => self.secondary_subgroup_ref = target,
            ParentSlot::Language => self.language_ref = target,
        }
    }

    /// Parent derived from the current level and slots
    pub fn computed_parent(&self) -> Option<LanguoidId> {
        self.level.compute_parent(&self.refs())
    }

    /// Re-derive `parent_ref`; returns true if it changed
    pub fn recompute_parent(&mut self) -> bool {
        let parent = self.computed_parent();
        let changed = parent != self.parent_ref;
        self.parent_ref = parent;
        changed
    }

    /// Whether two versions of a node differ in anything that shapes the tree
    pub fn hierarchy_differs(&self, other: &Languoid) -> bool {
        self.level != other.level
            || self.refs() != other.refs()
            || self.parent_ref != other.parent_ref
    }

    /// Short human-readable description used in diagnostics
    pub fn describe(&self) -> String {
        match &self.code {
            Some(code) => format!("{} [{}]", self.name, code),
            None => format!("{} ({})", self.name, self.id),
        }
    }

    /// Validate field presence, lengths, code format and coordinates
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()));
        }
        check_length("name", &self.name, MAX_NAME_LENGTH)?;
        if let Some(code) = &self.code {
            if !is_valid_code(code) {
                return Err(ValidationError::InvalidCode(code.clone()));
            }
        }
        check_optional_length("alt_names", self.alt_names.as_deref(), MAX_ALT_NAMES_LENGTH)?;
        check_optional_length("region", self.region.as_deref(), MAX_REGION_LENGTH)?;
        check_optional_length("tribes", self.tribes.as_deref(), MAX_TRIBES_LENGTH)?;
        check_optional_length("notes", self.notes.as_deref(), MAX_NOTES_LENGTH)?;
        check_optional_length(
            "modified_by",
            self.modified_by.as_deref(),
            MAX_MODIFIED_BY_LENGTH,
        )?;
        check_coordinate("latitude", self.latitude, 90.0)?;
        check_coordinate("longitude", self.longitude, 180.0)?;

        for slot in ParentSlot::ALL {
            if self.slot(slot) == Some(self.id) {
                return Err(ValidationError::SelfReference {
                    id: self.id,
                    slot: slot.as_str().to_string(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn check_length(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::too_long(field, max, actual));
    }
    Ok(())
}

pub(crate) fn check_optional_length(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => check_length(field, v, max),
        None => Ok(()),
    }
}

pub(crate) fn check_coordinate(
    field: &str,
    value: Option<f64>,
    bound: f64,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() || v.abs() > bound => Err(ValidationError::InvalidCoordinate {
            field: field.to_string(),
            value: v,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn languoid(level: LanguoidLevel) -> Languoid {
        LanguoidDraft::new("Test", level).into_languoid(LanguoidId(10), Utc::now())
    }

    #[test]
    fn test_empty_slots_have_no_parent() {
        let refs = SlotRefs::<LanguoidId>::default();
        assert_eq!(refs.get(ParentSlot::Family), None);
        assert_eq!(LanguoidLevel::Dialect.compute_parent(&refs), None);
    }

    #[test]
    fn test_coarse_level_mapping() {
        assert_eq!(LanguoidLevel::Family.coarse(), CoarseLevel::Family);
        assert_eq!(LanguoidLevel::Subfamily.coarse(), CoarseLevel::Family);
        assert_eq!(LanguoidLevel::SubSubfamily.coarse(), CoarseLevel::Family);
        assert_eq!(LanguoidLevel::Language.coarse(), CoarseLevel::Language);
        assert_eq!(LanguoidLevel::Dialect.coarse(), CoarseLevel::Dialect);
    }

    #[test]
    fn test_language_parent_prefers_secondary_subgroup() {
        let mut node = languoid(LanguoidLevel::Language);
        node.family_ref = Some(LanguoidId(1));
        node.primary_subgroup_ref = Some(LanguoidId(2));
        node.secondary_subgroup_ref = Some(LanguoidId(3));
        assert_eq!(node.computed_parent(), Some(LanguoidId(3)));

        node.secondary_subgroup_ref = None;
        assert_eq!(node.computed_parent(), Some(LanguoidId(2)));

        node.primary_subgroup_ref = None;
        assert_eq!(node.computed_parent(), Some(LanguoidId(1)));
    }

    #[test]
    fn test_dialect_parent_ignores_family_slot() {
        let mut node = languoid(LanguoidLevel::Dialect);
        node.family_ref = Some(LanguoidId(1));
        assert_eq!(node.computed_parent(), None);

        node.language_ref = Some(LanguoidId(5));
        assert!(node.recompute_parent());
        assert_eq!(node.parent_ref, Some(LanguoidId(5)));
    }

    #[test]
    fn test_family_never_has_parent() {
        let mut node = languoid(LanguoidLevel::Family);
        node.family_ref = Some(LanguoidId(1));
        node.primary_subgroup_ref = Some(LanguoidId(2));
        assert_eq!(node.computed_parent(), None);
    }

    #[test]
    fn test_level_serde_uses_kebab_case() {
        let json = serde_json::to_string(&LanguoidLevel::SubSubfamily).unwrap();
        assert_eq!(json, "\"sub-subfamily\"");
        let parsed: LanguoidLevel = serde_json::from_str("\"dialect\"").unwrap();
        assert_eq!(parsed, LanguoidLevel::Dialect);
        assert_eq!(
            "Sub-Subfamily".parse::<LanguoidLevel>().unwrap(),
            LanguoidLevel::SubSubfamily
        );
        assert!("clan".parse::<LanguoidLevel>().is_err());
    }

    #[test]
    fn test_validate_rejects_long_name_and_bad_code() {
        let mut node = languoid(LanguoidLevel::Language);
        node.name = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            node.validate(),
            Err(ValidationError::FieldTooLong { .. })
        ));

        node.name = "Valid".to_string();
        node.code = Some("ABC".to_string());
        assert_eq!(
            node.validate(),
            Err(ValidationError::InvalidCode("ABC".to_string()))
        );

        node.code = Some("abcd1234".to_string());
        assert!(node.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_coordinates() {
        let mut node = languoid(LanguoidLevel::Language);
        node.latitude = Some(91.0);
        assert!(matches!(
            node.validate(),
            Err(ValidationError::InvalidCoordinate { .. })
        ));
        node.latitude = Some(-45.5);
        node.longitude = Some(f64::NAN);
        assert!(node.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_self_reference() {
        let mut node = languoid(LanguoidLevel::Language);
        node.family_ref = Some(node.id);
        assert!(matches!(
            node.validate(),
            Err(ValidationError::SelfReference { .. })
        ));
    }
}
