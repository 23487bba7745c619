//! Database Error Types
//!
//! This module defines error types for store operations, providing clear
//! error handling for key violations and transaction failures.

use crate::models::LanguoidId;
use thiserror::Error;

/// Store operation errors
///
/// Covers constraint violations enforced by the store itself. Business-rule
/// failures are handled by service-layer error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatabaseError {
    /// Another languoid already uses this code
    #[error("Code '{code}' is already used by languoid {existing_id}")]
    DuplicateCode {
        code: String,
        existing_id: LanguoidId,
    },

    /// Update or delete targeted a missing row
    #[error("Languoid {id} does not exist")]
    UnknownLanguoid { id: LanguoidId },

    /// Transaction could not be started or committed
    #[error("Transaction failed: {context}")]
    TransactionFailed { context: String },
}

impl DatabaseError {
    /// Create a duplicate code error
    pub fn duplicate_code(code: impl Into<String>, existing_id: LanguoidId) -> Self {
        Self::DuplicateCode {
            code: code.into(),
            existing_id,
        }
    }

    /// Create an unknown languoid error
    pub fn unknown_languoid(id: LanguoidId) -> Self {
        Self::UnknownLanguoid { id }
    }

    /// Create a transaction failed error
    pub fn transaction_failed(context: impl Into<String>) -> Self {
        Self::TransactionFailed {
            context: context.into(),
        }
    }
}
