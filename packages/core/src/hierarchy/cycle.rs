//! Cycle detection over a node → parent mapping
//!
//! The validator walks each node's parent chain once. Nodes are coloured as
//! they are walked, so a node already proven to reach a root (or already
//! reported as part of a cycle) ends later walks early. Total work is linear in
//! the mapping size and every walk is bounded by it, so malformed input always
//! terminates.
//!
//! The mapping is generic over its key so the same check runs over stored ids
//! and over the mixed stored/pending keys of an import.

use std::collections::BTreeMap;

/// Result of validating a parent mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport<K> {
    Valid,
    /// Each inner list is one cycle, rotated to start at its smallest key
    CycleFound(Vec<Vec<K>>),
}

impl<K> CycleReport<K> {
    pub fn is_valid(&self) -> bool {
        matches!(self, CycleReport::Valid)
    }

    pub fn cycles(&self) -> &[Vec<K>] {
        match self {
            CycleReport::Valid => &[],
            CycleReport::CycleFound(cycles) => cycles,
        }
    }

    /// Render every cycle as `a -> b -> a` using `describe` for each node
    pub fn describe_with(&self, mut describe: impl FnMut(&K) -> String) -> Vec<String> {
        self.cycles()
            .iter()
            .map(|cycle| {
                let mut parts: Vec<String> = cycle.iter().map(&mut describe).collect();
                if let Some(first) = cycle.first() {
                    parts.push(describe(first));
                }
                parts.join(" -> ")
            })
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WalkState {
    InProgress,
    Done,
}

/// Checks parent mappings for cycles without mutating anything
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleValidator;

impl CycleValidator {
    /// Validate `node -> parent` edges
    ///
    /// Parents that are not themselves keys of the mapping are treated as
    /// roots.
    pub fn validate<K>(mapping: &BTreeMap<K, Option<K>>) -> CycleReport<K>
    where
        K: Ord + Clone,
    {
        let mut state: BTreeMap<&K, WalkState> = BTreeMap::new();
        let mut cycles = Vec::new();

        for start in mapping.keys() {
            if state.contains_key(start) {
                continue;
            }

            let mut path: Vec<&K> = Vec::new();
            let mut current = Some(start);

            while let Some(node) = current {
                match state.get(node) {
                    Some(WalkState::Done) => break,
                    Some(WalkState::InProgress) => {
                        // Revisited within this walk: the tail from `node` is a cycle
                        if let Some(from) = path.iter().position(|n| *n == node) {
                            cycles.push(normalize(&path[from..]));
                        }
                        break;
                    }
                    None => {}
                }

                if path.len() > mapping.len() {
                    break;
                }
                state.insert(node, WalkState::InProgress);
                path.push(node);

                current = match mapping.get(node) {
                    Some(Some(parent)) if mapping.contains_key(parent) => {
                        mapping.get_key_value(parent).map(|(k, _)| k)
                    }
                    _ => None,
                };
            }

            for node in path {
                state.insert(node, WalkState::Done);
            }
        }

        if cycles.is_empty() {
            CycleReport::Valid
        } else {
            tracing::warn!("Cycle check found {} cycle(s)", cycles.len());
            CycleReport::CycleFound(cycles)
        }
    }
}

fn normalize<K: Ord + Clone>(cycle: &[&K]) -> Vec<K> {
    let min_at = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle[min_at..]
        .iter()
        .chain(cycle[..min_at].iter())
        .map(|k| (*k).clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(edges: &[(u32, Option<u32>)]) -> BTreeMap<u32, Option<u32>> {
        edges.iter().copied().collect()
    }

    #[test]
    fn test_forest_is_valid() {
        let m = mapping(&[(1, None), (2, Some(1)), (3, Some(2)), (4, Some(1)), (5, None)]);
        assert!(CycleValidator::validate(&m).is_valid());
    }

    #[test]
    fn test_dangling_parent_is_a_root() {
        let m = mapping(&[(1, Some(99)), (2, Some(1))]);
        assert!(CycleValidator::validate(&m).is_valid());
    }

    #[test]
    fn test_self_loop_detected() {
        let m = mapping(&[(1, Some(1)), (2, Some(1))]);
        assert_eq!(
            CycleValidator::validate(&m),
            CycleReport::CycleFound(vec![vec![1]])
        );
    }

    #[test]
    fn test_each_cycle_reported_once() {
        // 2 -> 3 -> 4 -> 2, with a tail 5 -> 2 and a second cycle 7 <-> 8
        let m = mapping(&[
            (2, Some(3)),
            (3, Some(4)),
            (4, Some(2)),
            (5, Some(2)),
            (7, Some(8)),
            (8, Some(7)),
            (9, None),
        ]);
        let report = CycleValidator::validate(&m);
        assert_eq!(report.cycles(), &[vec![2, 3, 4], vec![7, 8]]);
    }

    #[test]
    fn test_tail_into_cycle_is_not_part_of_it() {
        let m = mapping(&[(1, Some(2)), (2, Some(3)), (3, Some(2))]);
        assert_eq!(report_cycles(&m), vec![vec![2, 3]]);
    }

    #[test]
    fn test_describe_with_closes_the_loop() {
        let m = mapping(&[(1, Some(2)), (2, Some(1))]);
        let described = CycleValidator::validate(&m).describe_with(|k| format!("n{}", k));
        assert_eq!(described, vec!["n1 -> n2 -> n1".to_string()]);
    }

    fn report_cycles(m: &BTreeMap<u32, Option<u32>>) -> Vec<Vec<u32>> {
        CycleValidator::validate(m).cycles().to_vec()
    }
}
