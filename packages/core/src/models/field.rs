//! Editable languoid fields
//!
//! The batch editor addresses languoid columns by name and carries values as
//! JSON, the same way the row-editor grid sends them. `LanguoidField` is the
//! closed set of editable columns; `read`/`write` convert between the typed
//! struct and the wire value.

use crate::models::languoid::{
    check_coordinate, check_length, check_optional_length, is_valid_code, Languoid, LanguoidId,
    LanguoidLevel, ParentSlot, ValidationError, MAX_ALT_NAMES_LENGTH, MAX_NAME_LENGTH,
    MAX_NOTES_LENGTH, MAX_REGION_LENGTH, MAX_TRIBES_LENGTH,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A column the batch editor may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguoidField {
    Code,
    Name,
    Level,
    FamilyRef,
    PrimarySubgroupRef,
    SecondarySubgroupRef,
    LanguageRef,
    AltNames,
    Region,
    Latitude,
    Longitude,
    Tribes,
    Notes,
}

impl LanguoidField {
    pub const ALL: [LanguoidField; 13] = [
        LanguoidField::Code,
        LanguoidField::Name,
        LanguoidField::Level,
        LanguoidField::FamilyRef,
        LanguoidField::PrimarySubgroupRef,
        LanguoidField::SecondarySubgroupRef,
        LanguoidField::LanguageRef,
        LanguoidField::AltNames,
        LanguoidField::Region,
        LanguoidField::Latitude,
        LanguoidField::Longitude,
        LanguoidField::Tribes,
        LanguoidField::Notes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LanguoidField::Code => "code",
            LanguoidField::Name => "name",
            LanguoidField::Level => "level",
            LanguoidField::FamilyRef => "family_ref",
            LanguoidField::PrimarySubgroupRef => "primary_subgroup_ref",
            LanguoidField::SecondarySubgroupRef => "secondary_subgroup_ref",
            LanguoidField::LanguageRef => "language_ref",
            LanguoidField::AltNames => "alt_names",
            LanguoidField::Region => "region",
            LanguoidField::Latitude => "latitude",
            LanguoidField::Longitude => "longitude",
            LanguoidField::Tribes => "tribes",
            LanguoidField::Notes => "notes",
        }
    }

    /// Reference slot backing this field, if it is one
    pub fn slot(self) -> Option<ParentSlot> {
        match self {
            LanguoidField::FamilyRef => Some(ParentSlot::Family),
            LanguoidField::PrimarySubgroupRef => Some(ParentSlot::PrimarySubgroup),
            LanguoidField::SecondarySubgroupRef => Some(ParentSlot::SecondarySubgroup),
            LanguoidField::LanguageRef => Some(ParentSlot::Language),
            _ => None,
        }
    }

    /// Current value of this field as a wire value
    pub fn read(self, languoid: &Languoid) -> Value {
        match self {
            LanguoidField::Code => opt_string(&languoid.code),
            LanguoidField::Name => Value::String(languoid.name.clone()),
            LanguoidField::Level => Value::String(languoid.level.as_str().to_string()),
            LanguoidField::AltNames => opt_string(&languoid.alt_names),
            LanguoidField::Region => opt_string(&languoid.region),
            LanguoidField::Tribes => opt_string(&languoid.tribes),
            LanguoidField::Notes => opt_string(&languoid.notes),
            LanguoidField::Latitude => opt_number(languoid.latitude),
            LanguoidField::Longitude => opt_number(languoid.longitude),
            LanguoidField::FamilyRef
            | LanguoidField::PrimarySubgroupRef
            | LanguoidField::SecondarySubgroupRef
            | LanguoidField::LanguageRef => {
                let slot = self.slot().map(|s| languoid.slot(s)).unwrap_or_default();
                slot.map(|id| Value::from(id.0)).unwrap_or(Value::Null)
            }
        }
    }

    /// Write a wire value into this field, validating type, length and format
    ///
    /// Does not recompute `parent_ref`; callers do that once after all writes.
    pub fn write(self, languoid: &mut Languoid, value: Value) -> Result<(), ValidationError> {
        match self {
            LanguoidField::Code => {
                let code = self.parse_opt_string(value)?;
                if let Some(code) = &code {
                    if !is_valid_code(code) {
                        return Err(ValidationError::InvalidCode(code.clone()));
                    }
                }
                languoid.code = code;
            }
            LanguoidField::Name => {
                let name = self
                    .parse_opt_string(value)?
                    .ok_or_else(|| ValidationError::MissingField("name".to_string()))?;
                check_length("name", &name, MAX_NAME_LENGTH)?;
                languoid.name = name;
            }
            LanguoidField::Level => {
                let raw = self
                    .parse_opt_string(value)?
                    .ok_or_else(|| ValidationError::MissingField("level".to_string()))?;
                languoid.level = LanguoidLevel::from_str(&raw)?;
            }
            LanguoidField::AltNames => {
                let v = self.parse_opt_string(value)?;
                check_optional_length("alt_names", v.as_deref(), MAX_ALT_NAMES_LENGTH)?;
                languoid.alt_names = v;
            }
            LanguoidField::Region => {
                let v = self.parse_opt_string(value)?;
                check_optional_length("region", v.as_deref(), MAX_REGION_LENGTH)?;
                languoid.region = v;
            }
            LanguoidField::Tribes => {
                let v = self.parse_opt_string(value)?;
                check_optional_length("tribes", v.as_deref(), MAX_TRIBES_LENGTH)?;
                languoid.tribes = v;
            }
            LanguoidField::Notes => {
                let v = self.parse_opt_string(value)?;
                check_optional_length("notes", v.as_deref(), MAX_NOTES_LENGTH)?;
                languoid.notes = v;
            }
            LanguoidField::Latitude => {
                let v = self.parse_opt_number(value)?;
                check_coordinate("latitude", v, 90.0)?;
                languoid.latitude = v;
            }
            LanguoidField::Longitude => {
                let v = self.parse_opt_number(value)?;
                check_coordinate("longitude", v, 180.0)?;
                languoid.longitude = v;
            }
            LanguoidField::FamilyRef
            | LanguoidField::PrimarySubgroupRef
            | LanguoidField::SecondarySubgroupRef
            | LanguoidField::LanguageRef => {
                let target = self.parse_opt_id(value)?;
                if let Some(slot) = self.slot() {
                    languoid.set_slot(slot, target);
                }
            }
        }
        Ok(())
    }

    fn parse_opt_string(self, value: Value) -> Result<Option<String>, ValidationError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => Ok(Some(s.trim().to_string())),
            other => Err(ValidationError::invalid_value(
                self.as_str(),
                format!("expected a string, got {}", other),
            )),
        }
    }

    fn parse_opt_number(self, value: Value) -> Result<Option<f64>, ValidationError> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| {
                ValidationError::invalid_value(self.as_str(), "number out of range")
            }),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
                ValidationError::invalid_value(self.as_str(), format!("'{}' is not a number", s))
            }),
            other => Err(ValidationError::invalid_value(
                self.as_str(),
                format!("expected a number, got {}", other),
            )),
        }
    }

    fn parse_opt_id(self, value: Value) -> Result<Option<LanguoidId>, ValidationError> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_i64().map(|id| Some(LanguoidId(id))).ok_or_else(|| {
                ValidationError::invalid_value(self.as_str(), "expected an integer id")
            }),
            other => Err(ValidationError::invalid_value(
                self.as_str(),
                format!("expected a languoid id, got {}", other),
            )),
        }
    }
}

impl fmt::Display for LanguoidField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguoidField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LanguoidField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownField(s.to_string()))
    }
}

fn opt_string(value: &Option<String>) -> Value {
    value
        .as_ref()
        .map(|s| Value::String(s.clone()))
        .unwrap_or(Value::Null)
}

fn opt_number(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguoidDraft;
    use chrono::Utc;
    use serde_json::json;

    fn sample() -> Languoid {
        LanguoidDraft::new("Sample", LanguoidLevel::Language)
            .with_code("samp1234")
            .into_languoid(LanguoidId(1), Utc::now())
    }

    #[test]
    fn test_read_write_reference_field() {
        let mut node = sample();
        assert_eq!(LanguoidField::FamilyRef.read(&node), Value::Null);

        LanguoidField::FamilyRef
            .write(&mut node, json!(42))
            .unwrap();
        assert_eq!(node.family_ref, Some(LanguoidId(42)));
        assert_eq!(LanguoidField::FamilyRef.read(&node), json!(42));

        LanguoidField::FamilyRef
            .write(&mut node, Value::Null)
            .unwrap();
        assert_eq!(node.family_ref, None);
    }

    #[test]
    fn test_write_rejects_wrong_types() {
        let mut node = sample();
        assert!(LanguoidField::Latitude
            .write(&mut node, json!("north"))
            .is_err());
        assert!(LanguoidField::FamilyRef
            .write(&mut node, json!("abcd1234"))
            .is_err());
        assert!(LanguoidField::Level.write(&mut node, json!("clan")).is_err());
        assert!(LanguoidField::Name.write(&mut node, json!("")).is_err());
    }

    #[test]
    fn test_write_enforces_length_limits() {
        let mut node = sample();
        let err = LanguoidField::Region
            .write(&mut node, json!("r".repeat(MAX_REGION_LENGTH + 1)))
            .unwrap_err();
        assert!(matches!(err, ValidationError::FieldTooLong { .. }));
    }

    #[test]
    fn test_numeric_strings_are_accepted_for_coordinates() {
        let mut node = sample();
        LanguoidField::Longitude
            .write(&mut node, json!(" 12.5 "))
            .unwrap();
        assert_eq!(node.longitude, Some(12.5));
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in LanguoidField::ALL {
            assert_eq!(field.as_str().parse::<LanguoidField>().unwrap(), field);
        }
        assert!(matches!(
            "parent_ref".parse::<LanguoidField>(),
            Err(ValidationError::UnknownField(_))
        ));
    }
}
