//! Maintenance Service
//!
//! Operator-facing operations that sit beside import and batch edit:
//!
//! - `verify_hierarchy` checks the persisted forest: cycles in `parent_ref`,
//!   parents that disagree with the level/slot rule, slots pointing at
//!   missing languoids, and closure rows that differ from a fresh rebuild
//! - `delete_languoid` removes a leaf that nothing references

use crate::db::LanguoidStore;
use crate::hierarchy::{ClosureBuilder, CycleValidator, HierarchyIndex};
use crate::models::{Languoid, LanguoidId, ParentSlot};
use crate::services::cache::CacheMaterializer;
use crate::services::closure_processor::{ClosureJob, JobPriority, JobScheduler};
use crate::services::error::LanguoidServiceError;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// A stored `parent_ref` that the parent rule would not produce
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentMismatch {
    pub id: LanguoidId,
    pub stored: Option<LanguoidId>,
    pub computed: Option<LanguoidId>,
}

/// A reference slot pointing at a languoid that does not exist
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingReference {
    pub id: LanguoidId,
    pub slot: ParentSlot,
    pub target: LanguoidId,
}

/// Result of `verify_hierarchy`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyReport {
    pub languoids: usize,
    /// Each cycle rendered as `a -> b -> a`
    pub cycles: Vec<String>,
    pub parent_mismatches: Vec<ParentMismatch>,
    pub dangling_references: Vec<DanglingReference>,
    /// Languoids whose materialized descendant set is out of date
    pub stale_closures: Vec<LanguoidId>,
}

impl HierarchyReport {
    pub fn is_consistent(&self) -> bool {
        self.cycles.is_empty()
            && self.parent_mismatches.is_empty()
            && self.dangling_references.is_empty()
            && self.stale_closures.is_empty()
    }
}

/// Maintenance operations over the stored catalog
pub struct MaintenanceService {
    store: Arc<LanguoidStore>,
    scheduler: Arc<dyn JobScheduler>,
    cache: Arc<CacheMaterializer>,
}

impl MaintenanceService {
    pub fn new(
        store: Arc<LanguoidStore>,
        scheduler: Arc<dyn JobScheduler>,
        cache: Arc<CacheMaterializer>,
    ) -> Self {
        Self {
            store,
            scheduler,
            cache,
        }
    }

    /// Check the persisted hierarchy for structural damage
    ///
    /// Closure rows are compared against a rebuild from the current
    /// `parent_ref` mapping, so a report taken while a closure job is still
    /// queued may list stale rows that the job is about to fix.
    pub async fn verify_hierarchy(&self) -> HierarchyReport {
        let languoids = self.store.all_languoids().await;
        let by_id: HashMap<LanguoidId, &Languoid> = languoids.iter().map(|l| (l.id, l)).collect();
        let describe = |id: &LanguoidId| {
            by_id
                .get(id)
                .map(|l| l.describe())
                .unwrap_or_else(|| id.to_string())
        };

        let mapping: BTreeMap<LanguoidId, Option<LanguoidId>> =
            languoids.iter().map(|l| (l.id, l.parent_ref)).collect();
        let cycles = CycleValidator::validate(&mapping).describe_with(describe);

        let mut parent_mismatches = Vec::new();
        let mut dangling_references = Vec::new();
        for languoid in &languoids {
            let computed = languoid.computed_parent();
            if computed != languoid.parent_ref {
                parent_mismatches.push(ParentMismatch {
                    id: languoid.id,
                    stored: languoid.parent_ref,
                    computed,
                });
            }
            for slot in ParentSlot::ALL {
                if let Some(target) = languoid.slot(slot) {
                    if !by_id.contains_key(&target) {
                        dangling_references.push(DanglingReference {
                            id: languoid.id,
                            slot,
                            target,
                        });
                    }
                }
            }
        }

        let index = HierarchyIndex::from_languoids(&languoids);
        let expected = ClosureBuilder::new(&index).full();
        let mut stale_closures = Vec::new();
        for languoid in &languoids {
            let stored = self.store.descendants_of(languoid.id).await;
            if expected.get(&languoid.id) != Some(&stored) {
                stale_closures.push(languoid.id);
            }
        }

        let report = HierarchyReport {
            languoids: languoids.len(),
            cycles,
            parent_mismatches,
            dangling_references,
            stale_closures,
        };
        if report.is_consistent() {
            tracing::info!("Hierarchy verified: {} languoids", report.languoids);
        } else {
            tracing::warn!(
                "Hierarchy inconsistent: {} cycle(s), {} parent mismatch(es), {} dangling reference(s), {} stale closure(s)",
                report.cycles.len(),
                report.parent_mismatches.len(),
                report.dangling_references.len(),
                report.stale_closures.len()
            );
        }
        report
    }

    /// Delete a languoid that has no children and is not referenced
    ///
    /// Schedules a scoped rebuild of its former ancestors and refreshes the
    /// cached listing.
    pub async fn delete_languoid(&self, id: LanguoidId) -> Result<Languoid, LanguoidServiceError> {
        let mut tx = self.store.begin().await;
        if !tx.contains(id) {
            return Err(LanguoidServiceError::languoid_not_found(id));
        }

        let children = tx.languoids().filter(|l| l.parent_ref == Some(id)).count();
        if children > 0 {
            return Err(LanguoidServiceError::HasDescendants { id, children });
        }

        let referenced_by: Vec<LanguoidId> = tx
            .languoids()
            .filter(|l| ParentSlot::ALL.iter().any(|slot| l.slot(*slot) == Some(id)))
            .map(|l| l.id)
            .collect();
        if !referenced_by.is_empty() {
            return Err(LanguoidServiceError::HasDependents { id, referenced_by });
        }

        let index = HierarchyIndex::from_languoids(tx.languoids());
        let mut affected: BTreeSet<LanguoidId> = index.ancestors(id).into_iter().collect();
        affected.insert(id);

        let removed = tx.delete(id)?;
        tx.commit();
        tracing::info!("Deleted {}", removed.describe());

        self.scheduler.schedule(
            ClosureJob::Scoped {
                ancestors: affected,
            },
            JobPriority::Normal,
        );
        if let Err(e) = self.cache.refresh().await {
            tracing::warn!("Cache refresh after delete failed: {}", e);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LanguoidDraft, LanguoidLevel};
    use crate::services::cache::InMemoryCache;
    use crate::services::closure_processor::RecordingScheduler;
    use std::time::Duration;

    async fn service_over(
        store: Arc<LanguoidStore>,
    ) -> (MaintenanceService, Arc<RecordingScheduler>) {
        let scheduler = Arc::new(RecordingScheduler::new());
        let cache = Arc::new(CacheMaterializer::new(
            Arc::new(InMemoryCache::new()),
            store.clone(),
            Duration::from_secs(60),
        ));
        (
            MaintenanceService::new(store, scheduler.clone(), cache),
            scheduler,
        )
    }

    async fn family_and_language(store: &LanguoidStore) -> (LanguoidId, LanguoidId) {
        let mut tx = store.begin().await;
        let family = tx
            .insert(LanguoidDraft::new("Family", LanguoidLevel::Family))
            .unwrap();
        let language = tx
            .insert(
                LanguoidDraft::new("Language", LanguoidLevel::Language)
                    .with_ref(ParentSlot::Family, family.id),
            )
            .unwrap();
        tx.commit();
        (family.id, language.id)
    }

    #[tokio::test]
    async fn test_delete_rejects_parent() {
        let store = Arc::new(LanguoidStore::new());
        let (family, _) = family_and_language(&store).await;
        let (service, scheduler) = service_over(store.clone()).await;

        let result = service.delete_languoid(family).await;
        assert!(matches!(
            result,
            Err(LanguoidServiceError::HasDescendants { children: 1, .. })
        ));
        assert!(store.get_languoid(family).await.is_some());
        assert!(scheduler.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_delete_leaf_schedules_ancestor_rebuild() {
        let store = Arc::new(LanguoidStore::new());
        let (family, language) = family_and_language(&store).await;
        let (service, scheduler) = service_over(store.clone()).await;

        service.delete_languoid(language).await.unwrap();
        assert!(store.get_languoid(language).await.is_none());
        assert_eq!(
            scheduler.jobs(),
            vec![(
                ClosureJob::Scoped {
                    ancestors: BTreeSet::from([family, language])
                },
                JobPriority::Normal
            )]
        );
    }

    #[tokio::test]
    async fn test_delete_rejects_slot_reference() {
        let store = Arc::new(LanguoidStore::new());
        let (_, language) = family_and_language(&store).await;
        // Dialects take their parent from the language slot only, so this is
        // a reference without being a child
        let mut tx = store.begin().await;
        tx.insert(
            LanguoidDraft::new("Dialect", LanguoidLevel::Dialect)
                .with_ref(ParentSlot::Family, language),
        )
        .unwrap();
        tx.commit();
        let (service, _) = service_over(store).await;

        let result = service.delete_languoid(language).await;
        assert!(matches!(
            result,
            Err(LanguoidServiceError::HasDependents { ref referenced_by, .. }) if referenced_by.len() == 1
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_languoid() {
        let (service, _) = service_over(Arc::new(LanguoidStore::new())).await;
        assert!(matches!(
            service.delete_languoid(LanguoidId(99)).await,
            Err(LanguoidServiceError::LanguoidNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_reports_stale_closures_until_rebuilt() {
        let store = Arc::new(LanguoidStore::new());
        let (family, _) = family_and_language(&store).await;
        let (service, _) = service_over(store.clone()).await;

        let report = service.verify_hierarchy().await;
        assert!(report.cycles.is_empty());
        assert!(report.parent_mismatches.is_empty());
        assert!(report.stale_closures.contains(&family));

        let languoids = store.all_languoids().await;
        let index = HierarchyIndex::from_languoids(&languoids);
        store.replace_closures(ClosureBuilder::new(&index).full()).await;
        assert!(service.verify_hierarchy().await.is_consistent());
    }

    #[tokio::test]
    async fn test_verify_reports_stored_cycle() {
        let a = LanguoidDraft::new("A", LanguoidLevel::Subfamily)
            .with_ref(ParentSlot::Family, LanguoidId(2))
            .into_languoid(LanguoidId(1), chrono::Utc::now());
        let b = LanguoidDraft::new("B", LanguoidLevel::Subfamily)
            .with_ref(ParentSlot::Family, LanguoidId(1))
            .into_languoid(LanguoidId(2), chrono::Utc::now());
        let store = Arc::new(LanguoidStore::with_languoids(vec![a, b]).unwrap());
        let (service, _) = service_over(store).await;

        let report = service.verify_hierarchy().await;
        assert_eq!(report.cycles, vec!["A (#1) -> B (#2) -> A (#1)".to_string()]);
        assert!(!report.is_consistent());
    }
}
