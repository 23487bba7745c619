//! Bulk Import Service
//!
//! Merges an external dataset into the store inside a single transaction.
//! Either the whole dataset lands or nothing does.
//!
//! # Pipeline
//!
//! 1. **Placeholder codes**: sentinel-coded records get a code, and every
//!    reference to the old sentinel is rewritten
//! 2. **Pre-flight**: field validation, duplicate dataset codes, identity
//!    matching, reference resolution and a cycle check over the computed
//!    parent graph (stored languoids included). Every problem is collected;
//!    any problem rejects the import with no writes.
//! 3. **Level-ordered apply**: records are written family → subfamily →
//!    sub-subfamily → language → dialect, so every reference resolves against
//!    a languoid already present in the transaction
//! 4. **Commit** and schedule a full closure rebuild
//!
//! A dry run executes steps 1-3 against the transaction's staged copy and then
//! drops it, so it reports exactly what a real run would.
//!
//! # Field guards
//!
//! A record matched by name never overwrites the stored name, and only fills
//! in a code if the languoid had none. A record matched by code keeps the
//! stored code. Languoids whose fields already equal the record are not
//! written at all, so re-importing the same dataset is a no-op.

use crate::config::CatalogConfig;
use crate::db::{LanguoidStore, StoreTransaction};
use crate::hierarchy::{
    assign_pseudo_codes, CycleValidator, HierarchyIndex, IdentityIndex, IdentityMatch, MatchedBy,
    PseudoAssignment, PseudoCodeGenerator, UsedCodes,
};
use crate::models::{ImportRecord, Languoid, LanguoidDraft, LanguoidId, ParentSlot, SlotRefs};
use crate::services::closure_processor::{ClosureJob, JobPriority, JobScheduler};
use crate::services::error::{ImportProblem, LanguoidServiceError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of a successful import or dry run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub dry_run: bool,
    pub records: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub placeholder_codes: Vec<PseudoAssignment>,
}

/// Node of the pre-flight parent graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum GraphKey {
    Existing(LanguoidId),
    Pending(usize),
}

/// Everything pre-flight learned about the dataset
struct Plan {
    records: Vec<ImportRecord>,
    /// Record indices in level order
    order: Vec<usize>,
    matches: Vec<IdentityMatch>,
    placeholder_codes: Vec<PseudoAssignment>,
}

/// Bulk import service
pub struct ImportService {
    store: Arc<LanguoidStore>,
    scheduler: Arc<dyn JobScheduler>,
    config: CatalogConfig,
}

impl ImportService {
    pub fn new(
        store: Arc<LanguoidStore>,
        scheduler: Arc<dyn JobScheduler>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            config,
        }
    }

    /// Import and commit
    pub async fn import(
        &self,
        records: Vec<ImportRecord>,
    ) -> Result<ImportSummary, LanguoidServiceError> {
        self.run(records, false).await
    }

    /// Run every check and the full apply, then discard the writes
    pub async fn dry_run(
        &self,
        records: Vec<ImportRecord>,
    ) -> Result<ImportSummary, LanguoidServiceError> {
        self.run(records, true).await
    }

    async fn run(
        &self,
        records: Vec<ImportRecord>,
        dry_run: bool,
    ) -> Result<ImportSummary, LanguoidServiceError> {
        tracing::info!(
            "Starting {} of {} record(s)",
            if dry_run { "import dry run" } else { "import" },
            records.len()
        );

        let mut tx = self.store.begin().await;
        let plan = match self.preflight(&tx, records) {
            Ok(plan) => plan,
            Err(e) => {
                tx.rollback();
                if let LanguoidServiceError::ImportRejected { problems } = &e {
                    tracing::warn!("Import rejected with {} problem(s)", problems.len());
                    for problem in problems {
                        tracing::debug!("  {}", problem);
                    }
                }
                return Err(e);
            }
        };

        // Errors below drop `tx`, rolling back every staged write
        let mut summary = apply(&mut tx, &plan)?;
        summary.dry_run = dry_run;
        summary.placeholder_codes = plan.placeholder_codes;

        let index = HierarchyIndex::from_languoids(tx.languoids());
        let report = CycleValidator::validate(&index.parent_map());
        if !report.is_valid() {
            let described = report.describe_with(|id| {
                tx.get(*id)
                    .map(Languoid::describe)
                    .unwrap_or_else(|| id.to_string())
            });
            return Err(LanguoidServiceError::circular_reference(described.join("; ")));
        }

        if dry_run {
            tx.rollback();
        } else {
            tx.commit();
            self.scheduler.schedule(ClosureJob::FullRebuild, JobPriority::Low);
        }

        tracing::info!(
            "Import {}: {} created, {} updated, {} unchanged, {} placeholder code(s)",
            if dry_run { "dry run finished" } else { "committed" },
            summary.created,
            summary.updated,
            summary.unchanged,
            summary.placeholder_codes.len()
        );
        Ok(summary)
    }

    fn preflight(
        &self,
        tx: &StoreTransaction,
        mut records: Vec<ImportRecord>,
    ) -> Result<Plan, LanguoidServiceError> {
        let index = IdentityIndex::from_languoids(tx.languoids());
        let mut used = UsedCodes::seeded(index.codes());
        let generator = PseudoCodeGenerator::new(self.config.pseudo_code_fallback.clone());
        let outcome = assign_pseudo_codes(&mut records, &index, &mut used, &generator)?;

        let mut problems: Vec<ImportProblem> = outcome
            .ambiguous_sentinels
            .iter()
            .map(|sentinel| ImportProblem::AmbiguousSentinel {
                sentinel: sentinel.clone(),
            })
            .collect();

        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by_key(|&i| records[i].level);

        for &i in &order {
            let record = &records[i];
            problems.extend(record.validate().into_iter().map(|error| ImportProblem::Invalid {
                record: record.describe(),
                error,
            }));
        }

        let mut by_code: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            let code = record.code.trim();
            if !code.is_empty() {
                by_code.entry(code).or_default().push(i);
            }
        }
        for (code, holders) in &by_code {
            if holders.len() > 1 {
                problems.push(ImportProblem::DuplicateCode {
                    code: code.to_string(),
                    records: holders.iter().map(|&i| records[i].describe()).collect(),
                });
            }
        }

        let matches: Vec<IdentityMatch> = records
            .iter()
            .map(|r| index.match_record(&r.code, r.name.trim()))
            .collect();

        let mut targets: BTreeMap<LanguoidId, Vec<usize>> = BTreeMap::new();
        for (i, matched) in matches.iter().enumerate() {
            match matched {
                IdentityMatch::Ambiguous(reason) => problems.push(ImportProblem::Ambiguous {
                    record: records[i].describe(),
                    reason: reason.clone(),
                }),
                IdentityMatch::Matched { id, .. } => targets.entry(*id).or_default().push(i),
                IdentityMatch::New => {}
            }
        }
        for (id, holders) in &targets {
            // Duplicate codes are already reported for code matches
            let unique_code = |i: usize| {
                by_code
                    .get(records[i].code.trim())
                    .map_or(true, |h| h.len() == 1)
            };
            if holders.len() > 1 && holders.iter().any(|&i| unique_code(i)) {
                problems.push(ImportProblem::ConflictingMatches {
                    languoid: *id,
                    records: holders.iter().map(|&i| records[i].describe()).collect(),
                });
            }
        }

        let key_of = |i: usize| match matches[i] {
            IdentityMatch::Matched { id, .. } => GraphKey::Existing(id),
            _ => GraphKey::Pending(i),
        };
        let mut position = vec![0usize; records.len()];
        for (pos, &i) in order.iter().enumerate() {
            position[i] = pos;
        }

        // Stored languoids keep their edges unless a record rewrites them
        let mut graph: BTreeMap<GraphKey, Option<GraphKey>> = tx
            .languoids()
            .map(|l| (GraphKey::Existing(l.id), l.parent_ref.map(GraphKey::Existing)))
            .collect();

        for &i in &order {
            let record = &records[i];
            let mut resolved: SlotRefs<GraphKey> = SlotRefs::default();
            for slot in ParentSlot::ALL {
                let Some(code) = record.reference(slot) else {
                    continue;
                };
                // Earlier-ordered records win over the stored code index
                let target = by_code
                    .get(code)
                    .and_then(|holders| holders.iter().find(|&&j| position[j] < position[i]))
                    .map(|&j| key_of(j))
                    .or_else(|| index.id_for_code(code).map(GraphKey::Existing));
                match target {
                    Some(key) => set_slot(&mut resolved, slot, key),
                    None => problems.push(ImportProblem::UnresolvedReference {
                        record: record.describe(),
                        slot,
                        code: code.to_string(),
                    }),
                }
            }
            graph.insert(key_of(i), record.level.compute_parent(&resolved));
        }

        let report = CycleValidator::validate(&graph);
        let describe_key = |key: &GraphKey| match key {
            GraphKey::Pending(i) => records[*i].describe(),
            GraphKey::Existing(id) => targets
                .get(id)
                .and_then(|holders| holders.first())
                .map(|&i| records[i].describe())
                .or_else(|| tx.get(*id).map(Languoid::describe))
                .unwrap_or_else(|| id.to_string()),
        };
        problems.extend(
            report
                .describe_with(describe_key)
                .into_iter()
                .map(|path| ImportProblem::Cycle { path }),
        );

        if !problems.is_empty() {
            return Err(LanguoidServiceError::ImportRejected { problems });
        }

        Ok(Plan {
            records,
            order,
            matches,
            placeholder_codes: outcome.assignments,
        })
    }
}

fn set_slot<T>(refs: &mut SlotRefs<T>, slot: ParentSlot, value: T) {
    match slot {
        ParentSlot::Family => refs.family = Some(value),
        ParentSlot::PrimarySubgroup => refs.primary_subgroup = Some(value),
        ParentSlot::SecondarySubgroup => refs.secondary_subgroup = Some(value),
        ParentSlot::Language => refs.language = Some(value),
    }
}

/// Write every record in level order
fn apply(tx: &mut StoreTransaction, plan: &Plan) -> Result<ImportSummary, LanguoidServiceError> {
    let mut summary = ImportSummary {
        dry_run: false,
        records: plan.records.len(),
        created: 0,
        updated: 0,
        unchanged: 0,
        placeholder_codes: Vec::new(),
    };

    for &i in &plan.order {
        let record = &plan.records[i];
        let refs = resolve_references(tx, record)?;

        match &plan.matches[i] {
            IdentityMatch::Matched { id, by } => {
                let current = tx
                    .get(*id)
                    .cloned()
                    .ok_or_else(|| LanguoidServiceError::languoid_not_found(*id))?;
                let mut merged = current.clone();
                merge_record(&mut merged, record, *by, &refs);
                merged.recompute_parent();

                if merged == current {
                    summary.unchanged += 1;
                } else {
                    tracing::debug!("Updating {} (matched by {:?})", current.describe(), by);
                    tx.update(merged)?;
                    summary.updated += 1;
                }
            }
            IdentityMatch::New => {
                let mut draft = LanguoidDraft::new(record.name.trim(), record.level)
                    .with_code(record.code.trim());
                draft.family_ref = refs.family;
                draft.primary_subgroup_ref = refs.primary_subgroup;
                draft.secondary_subgroup_ref = refs.secondary_subgroup;
                draft.language_ref = refs.language;
                draft.alt_names = record.alt_names.clone();
                draft.region = record.region.clone();
                draft.latitude = record.latitude;
                draft.longitude = record.longitude;
                draft.tribes = record.tribes.clone();
                draft.notes = record.notes.clone();

                let languoid = tx.insert(draft)?;
                tracing::debug!("Created {}", languoid.describe());
                summary.created += 1;
            }
            IdentityMatch::Ambiguous(reason) => {
                return Err(LanguoidServiceError::ImportRejected {
                    problems: vec![ImportProblem::Ambiguous {
                        record: record.describe(),
                        reason: reason.clone(),
                    }],
                });
            }
        }
    }

    Ok(summary)
}

/// Resolve a record's reference codes against the transaction
fn resolve_references(
    tx: &StoreTransaction,
    record: &ImportRecord,
) -> Result<SlotRefs<LanguoidId>, LanguoidServiceError> {
    let mut refs = SlotRefs::default();
    for slot in ParentSlot::ALL {
        if let Some(code) = record.reference(slot) {
            let target = tx.find_by_code(code).map(|l| l.id).ok_or_else(|| {
                LanguoidServiceError::UnresolvedReference {
                    record: record.describe(),
                    slot,
                    code: code.to_string(),
                }
            })?;
            set_slot(&mut refs, slot, target);
        }
    }
    Ok(refs)
}

/// Copy record fields onto a matched languoid, honouring the key guards
fn merge_record(
    languoid: &mut Languoid,
    record: &ImportRecord,
    by: MatchedBy,
    refs: &SlotRefs<LanguoidId>,
) {
    match by {
        MatchedBy::Code => languoid.name = record.name.trim().to_string(),
        MatchedBy::Name => {
            if languoid.code.is_none() {
                languoid.code = Some(record.code.trim().to_string());
            }
        }
    }
    languoid.level = record.level;
    for slot in ParentSlot::ALL {
        languoid.set_slot(slot, refs.get(slot).copied());
    }
    languoid.alt_names = record.alt_names.clone();
    languoid.region = record.region.clone();
    languoid.latitude = record.latitude;
    languoid.longitude = record.longitude;
    languoid.tribes = record.tribes.clone();
    languoid.notes = record.notes.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguoidLevel;
    use crate::services::closure_processor::RecordingScheduler;

    fn service(store: Arc<LanguoidStore>) -> (ImportService, Arc<RecordingScheduler>) {
        let scheduler = Arc::new(RecordingScheduler::new());
        let service = ImportService::new(store, scheduler.clone(), CatalogConfig::default());
        (service, scheduler)
    }

    #[tokio::test]
    async fn test_out_of_order_dataset_applies_in_level_order() {
        let store = Arc::new(LanguoidStore::new());
        let (service, scheduler) = service(store.clone());

        let records = vec![
            ImportRecord::new("dial1234", "Dialect", LanguoidLevel::Dialect)
                .with_reference(ParentSlot::Language, "lang1234"),
            ImportRecord::new("lang1234", "Language", LanguoidLevel::Language)
                .with_reference(ParentSlot::Family, "fami1234"),
            ImportRecord::new("fami1234", "Family", LanguoidLevel::Family),
        ];
        let summary = service.import(records).await.unwrap();
        assert_eq!(summary.created, 3);

        let family = store.find_by_code("fami1234").await.unwrap();
        let language = store.find_by_code("lang1234").await.unwrap();
        let dialect = store.find_by_code("dial1234").await.unwrap();
        assert_eq!(language.parent_ref, Some(family.id));
        assert_eq!(dialect.parent_ref, Some(language.id));
        assert_eq!(scheduler.jobs(), vec![(ClosureJob::FullRebuild, JobPriority::Low)]);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing_and_schedules_nothing() {
        let store = Arc::new(LanguoidStore::new());
        let (service, scheduler) = service(store.clone());

        let summary = service
            .dry_run(vec![ImportRecord::new("fami1234", "Family", LanguoidLevel::Family)])
            .await
            .unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.created, 1);
        assert!(store.is_empty().await);
        assert!(scheduler.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_all_problems_reported_together() {
        let store = Arc::new(LanguoidStore::new());
        let (service, _) = service(store.clone());

        let records = vec![
            ImportRecord::new("aaaa1234", "A", LanguoidLevel::Family),
            ImportRecord::new("aaaa1234", "B", LanguoidLevel::Family),
            ImportRecord::new("lang1234", "L", LanguoidLevel::Language)
                .with_reference(ParentSlot::Family, "miss1234"),
            ImportRecord::new("BAD", "", LanguoidLevel::Language),
        ];
        let err = service.import(records).await.unwrap_err();
        let problems = err.import_problems();

        assert!(problems.iter().any(|p| matches!(p, ImportProblem::DuplicateCode { .. })));
        assert!(problems
            .iter()
            .any(|p| matches!(p, ImportProblem::UnresolvedReference { .. })));
        assert!(problems.iter().any(|p| matches!(p, ImportProblem::Invalid { .. })));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reference_to_later_level_is_unresolved() {
        let store = Arc::new(LanguoidStore::new());
        let (service, _) = service(store.clone());

        // A family cannot point at a language processed after it
        let records = vec![
            ImportRecord::new("lang1234", "L", LanguoidLevel::Language),
            ImportRecord::new("fami1234", "F", LanguoidLevel::Family)
                .with_reference(ParentSlot::Language, "lang1234"),
        ];
        let err = service.import(records).await.unwrap_err();
        assert!(matches!(
            err.import_problems(),
            [ImportProblem::UnresolvedReference { slot: ParentSlot::Language, .. }]
        ));
    }

    #[tokio::test]
    async fn test_name_match_keeps_name_and_fills_missing_code() {
        let store = Arc::new(LanguoidStore::new());
        let mut tx = store.begin().await;
        let existing = tx
            .insert(LanguoidDraft::new("Tongue", LanguoidLevel::Family))
            .unwrap();
        tx.commit();

        let (service, _) = service(store.clone());
        let mut record = ImportRecord::new("tong1234", "Tongue", LanguoidLevel::Family);
        record.region = Some("Coast".to_string());
        let summary = service.import(vec![record]).await.unwrap();
        assert_eq!(summary.updated, 1);

        let stored = store.get_languoid(existing.id).await.unwrap();
        assert_eq!(stored.code.as_deref(), Some("tong1234"));
        assert_eq!(stored.region.as_deref(), Some("Coast"));
        assert_eq!(stored.name, "Tongue");
    }

    #[tokio::test]
    async fn test_code_match_renames() {
        let store = Arc::new(LanguoidStore::new());
        let mut tx = store.begin().await;
        let existing = tx
            .insert(LanguoidDraft::new("Old Name", LanguoidLevel::Family).with_code("fami1234"))
            .unwrap();
        tx.commit();

        let (service, _) = service(store.clone());
        service
            .import(vec![ImportRecord::new("fami1234", "New Name", LanguoidLevel::Family)])
            .await
            .unwrap();
        assert_eq!(store.get_languoid(existing.id).await.unwrap().name, "New Name");
    }

    #[tokio::test]
    async fn test_cycle_through_stored_languoids_is_rejected() {
        let store = Arc::new(LanguoidStore::new());
        let mut tx = store.begin().await;
        let family = tx
            .insert(LanguoidDraft::new("F", LanguoidLevel::Family).with_code("fami1234"))
            .unwrap();
        tx.insert(
            LanguoidDraft::new("S", LanguoidLevel::Subfamily)
                .with_code("subf1234")
                .with_ref(ParentSlot::Family, family.id),
        )
        .unwrap();
        tx.commit();

        // Re-level the family under its own subfamily
        let (service, scheduler) = service(store.clone());
        let records = vec![ImportRecord::new("fami1234", "F", LanguoidLevel::Subfamily)
            .with_reference(ParentSlot::Family, "subf1234")];
        let err = service.import(records).await.unwrap_err();

        assert!(matches!(err.import_problems(), [ImportProblem::Cycle { .. }]));
        assert_eq!(store.find_by_code("fami1234").await.unwrap().level, LanguoidLevel::Family);
        assert!(scheduler.jobs().is_empty());
    }
}
