//! Identity matching of incoming records against existing languoids
//!
//! Matching is a pure lookup over an `IdentityIndex` built from a snapshot,
//! so a dry run and a real run make identical decisions:
//!
//! 1. A non-empty code present in the store matches by code. Authoritative.
//! 2. Otherwise exactly one languoid with the same name matches by name.
//! 3. Several languoids with the same name, or a name match whose existing
//!    code differs from the record's code, is ambiguous.
//! 4. Anything else is new.

use crate::models::{Languoid, LanguoidId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Which key identified the existing languoid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    Code,
    Name,
}

/// Why a record could not be matched unambiguously
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmbiguityReason {
    /// More than one existing languoid carries the record's name
    DuplicateName {
        name: String,
        candidates: Vec<LanguoidId>,
    },

    /// The name identifies a languoid that already has a different code
    CodeNameConflict {
        code: String,
        name: String,
        existing_id: LanguoidId,
        existing_code: String,
    },
}

impl fmt::Display for AmbiguityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmbiguityReason::DuplicateName { name, candidates } => {
                let ids: Vec<String> = candidates.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "name '{}' matches {} existing languoids ({})",
                    name,
                    candidates.len(),
                    ids.join(", ")
                )
            }
            AmbiguityReason::CodeNameConflict {
                code,
                name,
                existing_id,
                existing_code,
            } => write!(
                f,
                "code '{}' is unknown but name '{}' matches languoid {} which has code '{}'",
                code, name, existing_id, existing_code
            ),
        }
    }
}

/// Result of matching one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityMatch {
    Matched { id: LanguoidId, by: MatchedBy },
    Ambiguous(AmbiguityReason),
    New,
}

/// Code and name lookup tables over a languoid snapshot
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    by_code: HashMap<String, LanguoidId>,
    by_name: HashMap<String, Vec<LanguoidId>>,
    codes: HashMap<LanguoidId, Option<String>>,
}

impl IdentityIndex {
    pub fn from_languoids<'a>(languoids: impl IntoIterator<Item = &'a Languoid>) -> Self {
        let mut index = Self::default();
        for languoid in languoids {
            index.insert(languoid);
        }
        index
    }

    pub fn insert(&mut self, languoid: &Languoid) {
        if let Some(code) = &languoid.code {
            self.by_code.insert(code.clone(), languoid.id);
        }
        self.by_name
            .entry(languoid.name.clone())
            .or_default()
            .push(languoid.id);
        self.codes.insert(languoid.id, languoid.code.clone());
    }

    pub fn id_for_code(&self, code: &str) -> Option<LanguoidId> {
        self.by_code.get(code).copied()
    }

    /// Every code held by an indexed languoid
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(String::as_str)
    }

    pub fn ids_for_name(&self, name: &str) -> &[LanguoidId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn code_of(&self, id: LanguoidId) -> Option<&str> {
        self.codes.get(&id).and_then(|c| c.as_deref())
    }

    /// Match a record by `(code, name)`
    ///
    /// An empty `code` means the record has none.
    pub fn match_record(&self, code: &str, name: &str) -> IdentityMatch {
        let code = code.trim();
        if !code.is_empty() {
            if let Some(id) = self.id_for_code(code) {
                return IdentityMatch::Matched {
                    id,
                    by: MatchedBy::Code,
                };
            }
        }

        match self.ids_for_name(name) {
            [] => IdentityMatch::New,
            [id] => match self.code_of(*id) {
                Some(existing_code) if !code.is_empty() && existing_code != code => {
                    IdentityMatch::Ambiguous(AmbiguityReason::CodeNameConflict {
                        code: code.to_string(),
                        name: name.to_string(),
                        existing_id: *id,
                        existing_code: existing_code.to_string(),
                    })
                }
                _ => IdentityMatch::Matched {
                    id: *id,
                    by: MatchedBy::Name,
                },
            },
            many => IdentityMatch::Ambiguous(AmbiguityReason::DuplicateName {
                name: name.to_string(),
                candidates: many.to_vec(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LanguoidDraft, LanguoidLevel};
    use chrono::Utc;

    fn node(id: i64, name: &str, code: Option<&str>) -> Languoid {
        let mut draft = LanguoidDraft::new(name, LanguoidLevel::Language);
        draft.code = code.map(str::to_string);
        draft.into_languoid(LanguoidId(id), Utc::now())
    }

    fn index() -> IdentityIndex {
        let nodes = vec![
            node(1, "Alpha", Some("alph1234")),
            node(2, "Beta", None),
            node(3, "Twin", Some("twin1111")),
            node(4, "Twin", Some("twin2222")),
        ];
        IdentityIndex::from_languoids(&nodes)
    }

    #[test]
    fn test_code_match_is_authoritative() {
        // Name points elsewhere, code still wins
        assert_eq!(
            index().match_record("alph1234", "Beta"),
            IdentityMatch::Matched {
                id: LanguoidId(1),
                by: MatchedBy::Code
            }
        );
    }

    #[test]
    fn test_falls_back_to_unique_name() {
        assert_eq!(
            index().match_record("", "Beta"),
            IdentityMatch::Matched {
                id: LanguoidId(2),
                by: MatchedBy::Name
            }
        );
        // Unknown code on a codeless node adopts the name match
        assert_eq!(
            index().match_record("beta1234", "Beta"),
            IdentityMatch::Matched {
                id: LanguoidId(2),
                by: MatchedBy::Name
            }
        );
    }

    #[test]
    fn test_duplicate_names_are_ambiguous() {
        let result = index().match_record("", "Twin");
        assert!(matches!(
            result,
            IdentityMatch::Ambiguous(AmbiguityReason::DuplicateName { ref candidates, .. })
                if candidates.len() == 2
        ));
    }

    #[test]
    fn test_name_match_with_other_code_is_ambiguous() {
        let result = index().match_record("alph9999", "Alpha");
        assert!(matches!(
            result,
            IdentityMatch::Ambiguous(AmbiguityReason::CodeNameConflict { .. })
        ));
    }

    #[test]
    fn test_unknown_record_is_new() {
        assert_eq!(index().match_record("", "Gamma"), IdentityMatch::New);
        assert_eq!(index().match_record("gamm1234", "Gamma"), IdentityMatch::New);
    }
}
