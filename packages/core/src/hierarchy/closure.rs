//! Transitive descendant sets over the `parent_ref` forest
//!
//! `HierarchyIndex` is an arena: languoid ids are mapped to dense slots, and
//! parent/children edges are stored as slot indices. Descendant and ancestor
//! walks are explicit worklists with a visited bitmap, so deep or malformed
//! trees never recurse and never loop.
//!
//! `ClosureBuilder` turns an index into closure-table rows, either for every
//! node (after a bulk import) or for a caller-chosen set of affected ancestors
//! (after a batch edit).

use crate::models::{Languoid, LanguoidId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Arena of `parent_ref` edges
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    ids: Vec<LanguoidId>,
    slots: HashMap<LanguoidId, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl HierarchyIndex {
    pub fn from_languoids<'a>(languoids: impl IntoIterator<Item = &'a Languoid>) -> Self {
        Self::from_parent_map(languoids.into_iter().map(|l| (l.id, l.parent_ref)))
    }

    /// Build from `(node, parent)` pairs
    ///
    /// A parent that is not itself a node is ignored and the node becomes a
    /// root.
    pub fn from_parent_map(
        edges: impl IntoIterator<Item = (LanguoidId, Option<LanguoidId>)>,
    ) -> Self {
        let edges: Vec<(LanguoidId, Option<LanguoidId>)> = edges.into_iter().collect();
        let mut index = Self {
            ids: Vec::with_capacity(edges.len()),
            slots: HashMap::with_capacity(edges.len()),
            parents: vec![None; edges.len()],
            children: vec![Vec::new(); edges.len()],
        };

        for (id, _) in &edges {
            index.slots.insert(*id, index.ids.len());
            index.ids.push(*id);
        }
        for (id, parent) in &edges {
            let (Some(&child), Some(&parent)) = (
                index.slots.get(id),
                parent.and_then(|p| index.slots.get(&p)),
            ) else {
                continue;
            };
            index.parents[child] = Some(parent);
            index.children[parent].push(child);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: LanguoidId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = LanguoidId> + '_ {
        self.ids.iter().copied()
    }

    pub fn parent_of(&self, id: LanguoidId) -> Option<LanguoidId> {
        let slot = *self.slots.get(&id)?;
        self.parents[slot].map(|p| self.ids[p])
    }

    pub fn children_of(&self, id: LanguoidId) -> Vec<LanguoidId> {
        self.slots
            .get(&id)
            .map(|&slot| self.children[slot].iter().map(|&c| self.ids[c]).collect())
            .unwrap_or_default()
    }

    /// The `node -> parent` mapping this index was built from
    pub fn parent_map(&self) -> BTreeMap<LanguoidId, Option<LanguoidId>> {
        self.ids
            .iter()
            .enumerate()
            .map(|(slot, id)| (*id, self.parents[slot].map(|p| self.ids[p])))
            .collect()
    }

    /// Every transitive child of `id`, never including `id` itself
    pub fn descendants(&self, id: LanguoidId) -> BTreeSet<LanguoidId> {
        let mut result = BTreeSet::new();
        let Some(&root) = self.slots.get(&id) else {
            return result;
        };

        let mut visited = vec![false; self.ids.len()];
        visited[root] = true;
        let mut worklist = vec![root];

        while let Some(slot) = worklist.pop() {
            for &child in &self.children[slot] {
                if visited[child] {
                    tracing::warn!(
                        "Cycle guard hit under {}: {} already visited",
                        id,
                        self.ids[child]
                    );
                    continue;
                }
                visited[child] = true;
                result.insert(self.ids[child]);
                worklist.push(child);
            }
        }
        result
    }

    /// Ancestors of `id`, nearest first, stopping at a root or a repeat
    pub fn ancestors(&self, id: LanguoidId) -> Vec<LanguoidId> {
        let mut result = Vec::new();
        let Some(&start) = self.slots.get(&id) else {
            return result;
        };

        let mut visited = vec![false; self.ids.len()];
        visited[start] = true;
        let mut current = self.parents[start];
        while let Some(slot) = current {
            if visited[slot] {
                tracing::warn!("Cycle guard hit above {} at {}", id, self.ids[slot]);
                break;
            }
            visited[slot] = true;
            result.push(self.ids[slot]);
            current = self.parents[slot];
        }
        result
    }

    /// Root-to-node path of `id`, including `id` itself
    pub fn ancestor_path(&self, id: LanguoidId) -> Vec<LanguoidId> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut path = self.ancestors(id);
        path.reverse();
        path.push(id);
        path
    }
}

/// Closure-table rows keyed by languoid
pub type ClosureTable = HashMap<LanguoidId, BTreeSet<LanguoidId>>;

/// Computes descendant sets from a `HierarchyIndex`
#[derive(Debug, Clone, Copy)]
pub struct ClosureBuilder<'a> {
    index: &'a HierarchyIndex,
}

impl<'a> ClosureBuilder<'a> {
    pub fn new(index: &'a HierarchyIndex) -> Self {
        Self { index }
    }

    /// Descendant set of every node in the index
    pub fn full(&self) -> ClosureTable {
        self.index
            .ids()
            .map(|id| (id, self.index.descendants(id)))
            .collect()
    }

    /// Descendant sets of the given nodes only
    ///
    /// Ids absent from the index are skipped; the caller decides what is
    /// affected.
    pub fn scoped(&self, affected: &BTreeSet<LanguoidId>) -> ClosureTable {
        affected
            .iter()
            .filter(|id| self.index.contains(**id))
            .map(|id| (*id, self.index.descendants(*id)))
            .collect()
    }

    /// Each changed node plus all of its ancestors
    pub fn affected_ancestors(
        &self,
        changed: impl IntoIterator<Item = LanguoidId>,
    ) -> BTreeSet<LanguoidId> {
        let mut affected = BTreeSet::new();
        for id in changed {
            if !self.index.contains(id) {
                continue;
            }
            if affected.insert(id) {
                affected.extend(self.index.ancestors(id));
            }
        }
        affected
    }
}
