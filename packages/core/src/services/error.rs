//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations, providing
//! detailed error handling for business logic failures.
//!
//! Import and batch-edit rejections carry every problem found, never just the
//! first, so an operator or client can fix all of them in one pass.

use crate::db::DatabaseError;
use crate::hierarchy::{AmbiguityReason, PseudoCodeError};
use crate::models::{LanguoidField, LanguoidId, ParentSlot, ValidationError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One pre-flight diagnostic of a bulk import
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportProblem {
    /// The record cannot be matched to a single existing languoid
    Ambiguous {
        record: String,
        reason: AmbiguityReason,
    },

    /// Several dataset records claim the same code
    DuplicateCode { code: String, records: Vec<String> },

    /// Several dataset records resolve to the same existing languoid
    ConflictingMatches {
        languoid: LanguoidId,
        records: Vec<String>,
    },

    /// A reference names a code that is neither stored nor imported earlier
    UnresolvedReference {
        record: String,
        slot: ParentSlot,
        code: String,
    },

    /// A "no code" sentinel is shared by several records and referenced
    AmbiguousSentinel { sentinel: String },

    /// The computed parent chain loops back on itself
    Cycle { path: String },

    /// A field fails validation
    Invalid {
        record: String,
        #[serde(serialize_with = "serialize_display")]
        error: ValidationError,
    },
}

impl fmt::Display for ImportProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportProblem::Ambiguous { record, reason } => {
                write!(f, "{}: ambiguous match, {}", record, reason)
            }
            ImportProblem::DuplicateCode { code, records } => {
                write!(f, "code '{}' is used by {}", code, records.join(", "))
            }
            ImportProblem::ConflictingMatches { languoid, records } => write!(
                f,
                "records {} all match languoid {}",
                records.join(", "),
                languoid
            ),
            ImportProblem::UnresolvedReference { record, slot, code } => write!(
                f,
                "{}: {} reference '{}' does not resolve to a stored or earlier imported languoid",
                record, slot, code
            ),
            ImportProblem::AmbiguousSentinel { sentinel } => write!(
                f,
                "sentinel '{}' is shared by several records and cannot be referenced",
                sentinel
            ),
            ImportProblem::Cycle { path } => write!(f, "cycle: {}", path),
            ImportProblem::Invalid { record, error } => write!(f, "{}: {}", record, error),
        }
    }
}

fn serialize_display<S: serde::Serializer>(
    value: &impl fmt::Display,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Identifies a row of a batch-edit request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKey {
    Existing(LanguoidId),
    Temporary(String),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Existing(id) => write!(f, "languoid {}", id),
            RowKey::Temporary(temp) => write!(f, "new row '{}'", temp),
        }
    }
}

/// A validation failure on one batch row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRowError {
    pub row_index: usize,
    pub row: RowKey,
    pub field: Option<LanguoidField>,
    pub message: String,
}

impl BatchRowError {
    pub fn new(
        row_index: usize,
        row: RowKey,
        field: Option<LanguoidField>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            row,
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for BatchRowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(
                f,
                "row {} ({}), field {}: {}",
                self.row_index, self.row, field, self.message
            ),
            None => write!(f, "row {} ({}): {}", self.row_index, self.row, self.message),
        }
    }
}

/// Service operation errors
#[derive(Error, Debug)]
pub enum LanguoidServiceError {
    /// Bulk import failed pre-flight; nothing was written
    #[error("Import rejected with {} problem(s)", .problems.len())]
    ImportRejected { problems: Vec<ImportProblem> },

    /// Placeholder codes ran out for a prefix
    #[error("Placeholder code space exhausted for prefix '{prefix}'")]
    PseudoCodeExhausted { prefix: String },

    /// A reference could not be resolved while applying an import
    #[error("Unresolved {slot} reference '{code}' on {record}")]
    UnresolvedReference {
        record: String,
        slot: ParentSlot,
        code: String,
    },

    /// Batch edit failed validation; nothing was written
    #[error("Batch rejected with {} validation error(s)", .errors.len())]
    BatchRejected { errors: Vec<BatchRowError> },

    /// Batch edit exceeds the configured row limit
    #[error("Batch has {rows} rows, limit is {max}")]
    BatchTooLarge { rows: usize, max: usize },

    /// Languoid not found by ID
    #[error("Languoid not found: {id}")]
    LanguoidNotFound { id: LanguoidId },

    /// Languoid still has children in the forest
    #[error("Languoid {id} has {children} child languoid(s)")]
    HasDescendants { id: LanguoidId, children: usize },

    /// Languoid is still referenced through an ancestor slot
    #[error("Languoid {id} is referenced by {} languoid(s)", .referenced_by.len())]
    HasDependents {
        id: LanguoidId,
        referenced_by: Vec<LanguoidId>,
    },

    /// Circular reference detected
    #[error("Circular reference detected: {context}")]
    CircularReference { context: String },

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    DatabaseError(#[from] DatabaseError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<PseudoCodeError> for LanguoidServiceError {
    fn from(err: PseudoCodeError) -> Self {
        match err {
            PseudoCodeError::Exhausted { prefix } => Self::PseudoCodeExhausted { prefix },
        }
    }
}

impl LanguoidServiceError {
    /// Create a languoid not found error
    pub fn languoid_not_found(id: LanguoidId) -> Self {
        Self::LanguoidNotFound { id }
    }

    /// Create a circular reference error
    pub fn circular_reference(context: impl Into<String>) -> Self {
        Self::CircularReference {
            context: context.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Problems carried by an import rejection, empty for other errors
    pub fn import_problems(&self) -> &[ImportProblem] {
        match self {
            Self::ImportRejected { problems } => problems,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_display_is_operator_readable() {
        let problem = ImportProblem::UnresolvedReference {
            record: "'Tongue A' [tong1234]".to_string(),
            slot: ParentSlot::Family,
            code: "miss0001".to_string(),
        };
        assert_eq!(
            problem.to_string(),
            "'Tongue A' [tong1234]: family reference 'miss0001' does not resolve to a stored or earlier imported languoid"
        );
    }

    #[test]
    fn test_problem_serializes_tagged() {
        let problem = ImportProblem::Invalid {
            record: "'X'".to_string(),
            error: ValidationError::MissingField("name".to_string()),
        };
        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["kind"], "invalid");
        assert_eq!(json["error"], "Missing required field: name");
    }

    #[test]
    fn test_exhaustion_converts() {
        let err: LanguoidServiceError = PseudoCodeError::Exhausted {
            prefix: "abcd".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            LanguoidServiceError::PseudoCodeExhausted { ref prefix } if prefix == "abcd"
        ));
    }
}
