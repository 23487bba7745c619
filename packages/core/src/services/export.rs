//! Hierarchical export order
//!
//! The spreadsheet exporter and the cached listing both consume languoids
//! sorted by their root-to-node name path, so every node appears directly
//! after its ancestors and siblings are alphabetical. Paths are walked over
//! `parent_ref` with the same cycle guard the closure builder uses.

use crate::hierarchy::HierarchyIndex;
use crate::models::{Languoid, LanguoidId, LanguoidLevel};
use serde::Serialize;
use std::collections::HashMap;

/// One row of the hierarchical listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub id: LanguoidId,
    pub code: Option<String>,
    pub name: String,
    pub level: LanguoidLevel,
    pub depth: usize,
    /// Ancestor names from the root down to this languoid
    pub path: Vec<String>,
}

/// Sort key: lowercase name then id for every node on the path
type PathKey = Vec<(String, LanguoidId)>;

fn path_keys(languoids: &[Languoid]) -> HashMap<LanguoidId, PathKey> {
    let index = HierarchyIndex::from_languoids(languoids);
    let names: HashMap<LanguoidId, String> = languoids
        .iter()
        .map(|l| (l.id, l.name.to_lowercase()))
        .collect();

    languoids
        .iter()
        .map(|l| {
            let key = index
                .ancestor_path(l.id)
                .into_iter()
                .map(|id| (names.get(&id).cloned().unwrap_or_default(), id))
                .collect();
            (l.id, key)
        })
        .collect()
}

/// Languoids ordered by their root-to-node name path
pub fn sort_hierarchically(languoids: &[Languoid]) -> Vec<Languoid> {
    let keys = path_keys(languoids);
    let mut sorted = languoids.to_vec();
    sorted.sort_by(|a, b| keys.get(&a.id).cmp(&keys.get(&b.id)));
    sorted
}

/// The hierarchically sorted listing served from the cache
pub fn hierarchical_listing(languoids: &[Languoid]) -> Vec<ListingEntry> {
    let index = HierarchyIndex::from_languoids(languoids);
    let names: HashMap<LanguoidId, &str> =
        languoids.iter().map(|l| (l.id, l.name.as_str())).collect();

    sort_hierarchically(languoids)
        .into_iter()
        .map(|l| {
            let path: Vec<String> = index
                .ancestor_path(l.id)
                .iter()
                .filter_map(|id| names.get(id).map(|n| n.to_string()))
                .collect();
            ListingEntry {
                id: l.id,
                code: l.code,
                name: l.name,
                level: l.level,
                depth: path.len().saturating_sub(1),
                path,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LanguoidDraft, ParentSlot};
    use chrono::Utc;

    fn node(id: i64, name: &str, level: LanguoidLevel, family: Option<i64>) -> Languoid {
        let mut draft = LanguoidDraft::new(name, level);
        if let Some(f) = family {
            draft = draft.with_ref(ParentSlot::Family, LanguoidId(f));
        }
        draft.into_languoid(LanguoidId(id), Utc::now())
    }

    #[test]
    fn test_children_follow_parents_alphabetically() {
        let languoids = vec![
            node(1, "Zeta", LanguoidLevel::Family, None),
            node(2, "alpha", LanguoidLevel::Language, Some(1)),
            node(3, "Beta", LanguoidLevel::Family, None),
            node(4, "Omega", LanguoidLevel::Language, Some(3)),
            node(5, "Delta", LanguoidLevel::Language, Some(1)),
        ];
        let names: Vec<String> = sort_hierarchically(&languoids)
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Beta", "Omega", "Zeta", "alpha", "Delta"]);
    }

    #[test]
    fn test_listing_carries_path_and_depth() {
        let languoids = vec![
            node(1, "Root", LanguoidLevel::Family, None),
            node(2, "Leaf", LanguoidLevel::Language, Some(1)),
        ];
        let listing = hierarchical_listing(&languoids);
        assert_eq!(listing[1].path, vec!["Root".to_string(), "Leaf".to_string()]);
        assert_eq!(listing[1].depth, 1);
        assert_eq!(listing[0].depth, 0);
    }
}
