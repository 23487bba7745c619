//! Placeholder codes for records without a real glottocode
//!
//! A placeholder is built from the record's name: its ASCII letters,
//! lowercased, first four kept (the last one repeated when shorter, a fallback
//! prefix when there are none), then a four-digit suffix starting at `0123`
//! and counting up until the code is unused. For example `Proto-Tongue`
//! becomes `prot0123`, or `prot0124` when that is taken.
//!
//! Uniqueness is checked against a `UsedCodes` accumulator owned by the
//! caller, so nothing leaks between imports or between a dry run and a real
//! run.

use crate::hierarchy::identity::IdentityIndex;
use crate::models::{ImportRecord, ParentSlot};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// First numeric suffix tried for a placeholder code
pub const PSEUDO_SUFFIX_START: u32 = 123;

/// Number of distinct suffixes per prefix (0000-9999)
const PSEUDO_SUFFIX_SPACE: u32 = 10_000;

/// Prefix used when a name contains no letters
pub const DEFAULT_FALLBACK_PREFIX: &str = "xxxx";

const PREFIX_LENGTH: usize = 4;

/// Placeholder generation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PseudoCodeError {
    /// Every suffix 0000-9999 is taken for this prefix
    #[error("Placeholder code space exhausted for prefix '{prefix}'")]
    Exhausted { prefix: String },
}

/// Codes already taken, threaded through one import run
#[derive(Debug, Clone, Default)]
pub struct UsedCodes {
    codes: HashSet<String>,
}

impl UsedCodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            codes: codes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Mark a code as taken; returns false if it already was
    pub fn reserve(&mut self, code: impl Into<String>) -> bool {
        self.codes.insert(code.into())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Builds placeholder codes from names
#[derive(Debug, Clone)]
pub struct PseudoCodeGenerator {
    fallback: String,
}

impl Default for PseudoCodeGenerator {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_FALLBACK_PREFIX.to_string(),
        }
    }
}

impl PseudoCodeGenerator {
    /// Generator with a custom fallback prefix
    ///
    /// The fallback must be four lowercase ASCII letters; anything else
    /// falls back to [`DEFAULT_FALLBACK_PREFIX`].
    pub fn new(fallback: impl Into<String>) -> Self {
        let fallback = fallback.into();
        let valid = fallback.len() == PREFIX_LENGTH
            && fallback.chars().all(|c| c.is_ascii_lowercase());
        if !valid {
            tracing::warn!(
                "Ignoring invalid placeholder fallback prefix '{}', using '{}'",
                fallback,
                DEFAULT_FALLBACK_PREFIX
            );
            return Self::default();
        }
        Self { fallback }
    }

    /// Four-letter prefix derived from a name
    pub fn prefix_for(&self, name: &str) -> String {
        let letters: Vec<char> = name
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .take(PREFIX_LENGTH)
            .collect();

        match letters.last() {
            None => self.fallback.clone(),
            Some(&last) => {
                let mut prefix: String = letters.iter().collect();
                while prefix.len() < PREFIX_LENGTH {
                    prefix.push(last);
                }
                prefix
            }
        }
    }

    /// Generate an unused placeholder for `name` and reserve it
    pub fn generate(&self, name: &str, used: &mut UsedCodes) -> Result<String, PseudoCodeError> {
        let prefix = self.prefix_for(name);
        (0..PSEUDO_SUFFIX_SPACE)
            .map(|offset| (PSEUDO_SUFFIX_START + offset) % PSEUDO_SUFFIX_SPACE)
            .map(|suffix| format!("{}{:04}", prefix, suffix))
            .find(|candidate| !used.contains(candidate))
            .map(|code| {
                used.reserve(code.clone());
                code
            })
            .ok_or(PseudoCodeError::Exhausted { prefix })
    }
}

/// One placeholder decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PseudoAssignment {
    pub record_index: usize,
    pub name: String,
    /// Sentinel the record carried before assignment
    pub sentinel: String,
    pub code: String,
    /// True when the code was taken from an existing languoid matched by name
    pub reused: bool,
}

/// Everything `assign_pseudo_codes` decided
#[derive(Debug, Clone, Default)]
pub struct PseudoCodeOutcome {
    pub assignments: Vec<PseudoAssignment>,
    /// Non-empty sentinels carried by several records and referenced by others
    pub ambiguous_sentinels: Vec<String>,
}

/// Replace every sentinel code in `records` and rewrite references to it
///
/// A sentinel record whose name matches exactly one existing languoid that
/// already has a code keeps that code, so re-importing the same dataset is a
/// no-op. All other sentinel records get a fresh placeholder.
pub fn assign_pseudo_codes(
    records: &mut [ImportRecord],
    index: &IdentityIndex,
    used: &mut UsedCodes,
    generator: &PseudoCodeGenerator,
) -> Result<PseudoCodeOutcome, PseudoCodeError> {
    for record in records.iter().filter(|r| !r.has_sentinel_code()) {
        used.reserve(record.code.trim());
    }

    let mut sentinel_counts: HashMap<String, usize> = HashMap::new();
    for record in records.iter().filter(|r| r.has_sentinel_code()) {
        let sentinel = record.code.trim();
        if !sentinel.is_empty() {
            *sentinel_counts.entry(sentinel.to_string()).or_default() += 1;
        }
    }

    let mut outcome = PseudoCodeOutcome::default();
    for (record_index, record) in records.iter_mut().enumerate() {
        if !record.has_sentinel_code() {
            continue;
        }

        let existing_code = match index.ids_for_name(record.name.trim()) {
            [id] => index.code_of(*id).map(str::to_string),
            _ => None,
        };
        let (code, reused) = match existing_code {
            Some(code) => (code, true),
            None => (generator.generate(&record.name, used)?, false),
        };

        tracing::debug!(
            "Assigned code '{}' to {} (sentinel '{}', reused: {})",
            code,
            record.describe(),
            record.code,
            reused
        );
        let sentinel = std::mem::replace(&mut record.code, code.clone());
        outcome.assignments.push(PseudoAssignment {
            record_index,
            name: record.name.clone(),
            sentinel: sentinel.trim().to_string(),
            code,
            reused,
        });
    }

    for assignment in &outcome.assignments {
        let sentinel = assignment.sentinel.as_str();
        if sentinel.is_empty() {
            continue;
        }
        if sentinel_counts.get(sentinel).copied().unwrap_or(0) > 1 {
            let referenced = records.iter().any(|r| {
                ParentSlot::ALL
                    .iter()
                    .any(|slot| r.reference(*slot) == Some(sentinel))
            });
            if referenced && !outcome.ambiguous_sentinels.iter().any(|s| s == sentinel) {
                outcome.ambiguous_sentinels.push(sentinel.to_string());
            }
            continue;
        }
        rewrite_references(records, sentinel, &assignment.code);
    }

    Ok(outcome)
}

fn rewrite_references(records: &mut [ImportRecord], sentinel: &str, code: &str) {
    for record in records.iter_mut() {
        for slot in ParentSlot::ALL {
            if record.reference(slot) == Some(sentinel) {
                *record.reference_mut(slot) = code.to_string();
            }
        }
    }
}
