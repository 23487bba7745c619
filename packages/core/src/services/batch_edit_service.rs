//! Batch Edit Service
//!
//! Applies a bounded batch of row edits from the row-editor grid inside one
//! transaction, with optimistic concurrency decided per field.
//!
//! # Outcomes
//!
//! - **Applied**: every non-conflicting field of every row is written
//! - **Conflict**: a field another editor changed after this client loaded it
//!   is dropped and reported with the stored, original and attempted values.
//!   Other fields and rows still apply; conflicts never roll back the batch.
//! - **Rejected**: any validation error (bad value, unknown reference,
//!   duplicate code, cycle) rolls back the whole batch and every error is
//!   returned together. A languoid may be the target of at most one update
//!   row per batch.
//!
//! # After commit
//!
//! Rows whose level or reference slots changed, plus their former parents,
//! are expanded to their ancestors and handed to the closure processor as one
//! scoped rebuild. Languages demoted to another level get a separate
//! orphan-cleanup job. The cached listing is refreshed once per batch.
//!
//! Slot fields accept either a languoid id or the `temporary_id` of a create
//! row earlier in the same batch.

use crate::db::{LanguoidStore, StoreTransaction};
use crate::hierarchy::{ClosureBuilder, CycleValidator, HierarchyIndex};
use crate::models::{
    resolve_field, FieldResolution, Languoid, LanguoidDraft, LanguoidField, LanguoidId,
    LanguoidLevel, Versioned,
};
use crate::services::cache::CacheMaterializer;
use crate::services::closure_processor::{ClosureJob, JobPriority, JobScheduler};
use crate::services::error::{BatchRowError, LanguoidServiceError, RowKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One row of a batch-edit request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchRow {
    Create {
        temporary_id: String,
        fields: BTreeMap<LanguoidField, Value>,
    },
    Update {
        id: LanguoidId,
        changes: BTreeMap<LanguoidField, Value>,
        client_seen_updated_at: DateTime<Utc>,
        /// Value of each changed field as the client loaded it
        #[serde(default)]
        client_original_values: BTreeMap<LanguoidField, Value>,
    },
}

impl BatchRow {
    fn key(&self) -> RowKey {
        match self {
            BatchRow::Create { temporary_id, .. } => RowKey::Temporary(temporary_id.clone()),
            BatchRow::Update { id, .. } => RowKey::Existing(*id),
        }
    }
}

/// A batch-edit request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchEditRequest {
    pub rows: Vec<BatchRow>,
    /// Audit name stamped on every written row
    #[serde(default)]
    pub modified_by: Option<String>,
}

/// A row that was written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedRow {
    pub row_index: usize,
    pub id: LanguoidId,
    pub temporary_id: Option<String>,
    pub applied_fields: Vec<LanguoidField>,
    pub updated_at: DateTime<Utc>,
}

impl AppliedRow {
    /// Key of the request row, by temporary id for creates
    fn key(&self) -> RowKey {
        match &self.temporary_id {
            Some(temp) => RowKey::Temporary(temp.clone()),
            None => RowKey::Existing(self.id),
        }
    }
}

/// One dropped field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConflict {
    pub field: LanguoidField,
    pub stored: Value,
    pub original: Option<Value>,
    pub attempted: Value,
}

/// Every dropped field of one row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowConflict {
    pub row_index: usize,
    pub row_id: LanguoidId,
    pub conflicting_fields: Vec<FieldConflict>,
    /// Row as stored after this batch
    pub current_stored_state: Languoid,
    /// True when no field of the row was applied
    pub skipped: bool,
}

/// What was saved and what needs the client's attention
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchEditResponse {
    pub applied_rows: Vec<AppliedRow>,
    pub conflicts: Vec<RowConflict>,
    /// `temporary_id` of each create row mapped to its assigned id
    pub created_ids: BTreeMap<String, LanguoidId>,
}

/// Structural effects of a batch, collected while applying rows
#[derive(Debug, Default)]
struct HierarchyEffects {
    changed: BTreeSet<LanguoidId>,
    stale_parents: BTreeSet<LanguoidId>,
    former_languages: BTreeSet<LanguoidId>,
}

impl HierarchyEffects {
    fn record(&mut self, before: Option<&Languoid>, after: &Languoid) {
        match before {
            None => {
                self.changed.insert(after.id);
            }
            Some(before) if before.hierarchy_differs(after) => {
                self.changed.insert(after.id);
                if let Some(parent) = before.parent_ref {
                    self.stale_parents.insert(parent);
                }
                if before.level == LanguoidLevel::Language && after.level != LanguoidLevel::Language
                {
                    self.former_languages.insert(after.id);
                }
            }
            Some(_) => {}
        }
    }
}

/// Batch edit service
pub struct BatchEditService {
    store: Arc<LanguoidStore>,
    scheduler: Arc<dyn JobScheduler>,
    cache: Arc<CacheMaterializer>,
    max_rows: usize,
}

impl BatchEditService {
    pub fn new(
        store: Arc<LanguoidStore>,
        scheduler: Arc<dyn JobScheduler>,
        cache: Arc<CacheMaterializer>,
        max_rows: usize,
    ) -> Self {
        Self {
            store,
            scheduler,
            cache,
            max_rows,
        }
    }

    /// Apply a batch
    pub async fn apply(
        &self,
        request: BatchEditRequest,
    ) -> Result<BatchEditResponse, LanguoidServiceError> {
        if request.rows.len() > self.max_rows {
            return Err(LanguoidServiceError::BatchTooLarge {
                rows: request.rows.len(),
                max: self.max_rows,
            });
        }

        let mut tx = self.store.begin().await;
        let mut response = BatchEditResponse::default();
        let mut errors: Vec<BatchRowError> = Vec::new();
        let mut effects = HierarchyEffects::default();
        let mut updated_by_row: BTreeMap<LanguoidId, usize> = BTreeMap::new();

        for (row_index, row) in request.rows.into_iter().enumerate() {
            let key = row.key();
            if let BatchRow::Update { id, .. } = &row {
                if let Some(first) = updated_by_row.get(id) {
                    errors.push(BatchRowError::new(
                        row_index,
                        key,
                        None,
                        format!("languoid {} is already updated by row {}", id, first),
                    ));
                    continue;
                }
                updated_by_row.insert(*id, row_index);
            }
            let result = match row {
                BatchRow::Create {
                    temporary_id,
                    fields,
                } => apply_create(
                    &mut tx,
                    row_index,
                    temporary_id,
                    fields,
                    request.modified_by.as_deref(),
                    &mut response,
                    &mut effects,
                ),
                BatchRow::Update {
                    id,
                    changes,
                    client_seen_updated_at,
                    client_original_values,
                } => apply_update(
                    &mut tx,
                    row_index,
                    id,
                    changes,
                    client_seen_updated_at,
                    client_original_values,
                    request.modified_by.as_deref(),
                    &mut response,
                    &mut effects,
                ),
            };
            if let Err(row_errors) = result {
                errors.extend(row_errors.into_iter().map(|(field, message)| {
                    BatchRowError::new(row_index, key.clone(), field, message)
                }));
            }
        }

        let index = HierarchyIndex::from_languoids(tx.languoids());
        if !effects.changed.is_empty() {
            let report = CycleValidator::validate(&index.parent_map());
            for cycle in report.cycles() {
                let path: Vec<String> = cycle
                    .iter()
                    .map(|id| tx.get(*id).map(Languoid::describe).unwrap_or_default())
                    .collect();
                for applied in &response.applied_rows {
                    if cycle.contains(&applied.id) {
                        errors.push(BatchRowError::new(
                            applied.row_index,
                            applied.key(),
                            None,
                            format!("would create a cycle: {}", path.join(" -> ")),
                        ));
                    }
                }
            }
        }

        if !errors.is_empty() {
            tracing::warn!("Batch rejected with {} validation error(s)", errors.len());
            tx.rollback();
            return Err(LanguoidServiceError::BatchRejected { errors });
        }

        let builder = ClosureBuilder::new(&index);
        let affected = builder.affected_ancestors(
            effects
                .changed
                .iter()
                .chain(effects.stale_parents.iter())
                .copied(),
        );

        // Report the post-batch state of partially applied rows
        for conflict in &mut response.conflicts {
            if let Some(current) = tx.get(conflict.row_id) {
                conflict.current_stored_state = current.clone();
            }
        }

        let wrote_anything = !response.applied_rows.is_empty();
        tx.commit();

        if !effects.former_languages.is_empty() {
            self.scheduler.schedule(
                ClosureJob::OrphanCleanup {
                    former_languages: effects.former_languages,
                },
                JobPriority::High,
            );
        }
        if !affected.is_empty() {
            self.scheduler.schedule(
                ClosureJob::Scoped {
                    ancestors: affected,
                },
                JobPriority::Normal,
            );
        }
        if wrote_anything {
            if let Err(e) = self.cache.refresh().await {
                tracing::warn!("Cache refresh after batch failed: {}", e);
            }
        }

        tracing::info!(
            "Batch committed: {} row(s) applied, {} row(s) with conflicts",
            response.applied_rows.len(),
            response.conflicts.len()
        );
        Ok(response)
    }
}

type RowErrors = Vec<(Option<LanguoidField>, String)>;

/// Replace a temporary id in a slot field with the id it was assigned
fn resolve_temporary(
    field: LanguoidField,
    value: Value,
    created_ids: &BTreeMap<String, LanguoidId>,
) -> Value {
    match (field.slot(), &value) {
        (Some(_), Value::String(temp)) => match created_ids.get(temp) {
            Some(id) => Value::from(id.0),
            None => value,
        },
        _ => value,
    }
}

/// Check that every slot points at a languoid visible to the transaction
fn check_references(tx: &StoreTransaction, languoid: &Languoid) -> RowErrors {
    let mut errors = Vec::new();
    for field in LanguoidField::ALL {
        let Some(slot) = field.slot() else { continue };
        let Some(target) = languoid.slot(slot) else {
            continue;
        };
        if target != languoid.id && !tx.contains(target) {
            errors.push((Some(field), format!("languoid {} does not exist", target)));
        }
    }
    errors
}

#[allow(clippy::too_many_arguments)]
fn apply_create(
    tx: &mut StoreTransaction,
    row_index: usize,
    temporary_id: String,
    fields: BTreeMap<LanguoidField, Value>,
    modified_by: Option<&str>,
    response: &mut BatchEditResponse,
    effects: &mut HierarchyEffects,
) -> Result<(), RowErrors> {
    if response.created_ids.contains_key(&temporary_id) {
        return Err(vec![(None, format!("duplicate temporary id '{}'", temporary_id))]);
    }

    let mut errors: RowErrors = Vec::new();
    for required in [LanguoidField::Name, LanguoidField::Level] {
        if !fields.contains_key(&required) {
            errors.push((Some(required), "required for new languoids".to_string()));
        }
    }

    // Scratch languoid the fields are written into; the store assigns the id
    let mut scratch = LanguoidDraft::new("", LanguoidLevel::Language)
        .into_languoid(LanguoidId(0), Utc::now());
    let applied_fields: Vec<LanguoidField> = fields.keys().copied().collect();
    for (field, value) in fields {
        let value = resolve_temporary(field, value, &response.created_ids);
        if let Err(e) = field.write(&mut scratch, value) {
            errors.push((Some(field), e.to_string()));
        }
    }
    scratch.modified_by = modified_by.map(str::to_string);
    if errors.is_empty() {
        if let Err(e) = scratch.validate() {
            errors.push((None, e.to_string()));
        }
        errors.extend(check_references(tx, &scratch));
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let created = tx
        .insert(LanguoidDraft::from(scratch))
        .map_err(|e| vec![(None, e.to_string())])?;
    tracing::debug!("Created {} for row '{}'", created.describe(), temporary_id);

    effects.record(None, &created);
    response.created_ids.insert(temporary_id.clone(), created.id);
    response.applied_rows.push(AppliedRow {
        row_index,
        id: created.id,
        temporary_id: Some(temporary_id),
        applied_fields,
        updated_at: created.updated_at,
    });
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_update(
    tx: &mut StoreTransaction,
    row_index: usize,
    id: LanguoidId,
    changes: BTreeMap<LanguoidField, Value>,
    client_seen: DateTime<Utc>,
    originals: BTreeMap<LanguoidField, Value>,
    modified_by: Option<&str>,
    response: &mut BatchEditResponse,
    effects: &mut HierarchyEffects,
) -> Result<(), RowErrors> {
    let stored = tx
        .get(id)
        .cloned()
        .ok_or_else(|| vec![(None, format!("languoid {} does not exist", id))])?;

    let mut errors: RowErrors = Vec::new();
    let mut to_apply: Vec<(LanguoidField, Value)> = Vec::new();
    let mut conflicts: Vec<FieldConflict> = Vec::new();

    for (field, attempted) in changes {
        let attempted = resolve_temporary(field, attempted, &response.created_ids);
        // Round-trip through the typed field so equal values compare equal
        let attempted = match normalize(&stored, field, attempted) {
            Ok(value) => value,
            Err(message) => {
                errors.push((Some(field), message));
                continue;
            }
        };
        let original = originals
            .get(&field)
            .cloned()
            .map(|v| normalize(&stored, field, v.clone()).unwrap_or(v));
        let current = Versioned::new(field.read(&stored), stored.updated_at);

        match resolve_field(&current, client_seen, original.as_ref(), attempted) {
            FieldResolution::Apply(value) => to_apply.push((field, value)),
            FieldResolution::Unchanged => {}
            FieldResolution::Conflict {
                stored,
                original,
                attempted,
            } => conflicts.push(FieldConflict {
                field,
                stored,
                original,
                attempted,
            }),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let skipped = to_apply.is_empty();
    if !conflicts.is_empty() {
        tracing::debug!(
            "Row {} ({}): {} conflicting field(s)",
            row_index,
            stored.describe(),
            conflicts.len()
        );
        response.conflicts.push(RowConflict {
            row_index,
            row_id: id,
            conflicting_fields: conflicts,
            current_stored_state: stored.clone(),
            skipped,
        });
    }
    if skipped {
        return Ok(());
    }

    let mut updated = stored.clone();
    let applied_fields: Vec<LanguoidField> = to_apply.iter().map(|(f, _)| *f).collect();
    for (field, value) in to_apply {
        if let Err(e) = field.write(&mut updated, value) {
            errors.push((Some(field), e.to_string()));
        }
    }
    updated.modified_by = modified_by.map(str::to_string).or(updated.modified_by);
    updated.recompute_parent();
    if let Err(e) = updated.validate() {
        errors.push((None, e.to_string()));
    }
    errors.extend(check_references(tx, &updated));
    if !errors.is_empty() {
        return Err(errors);
    }

    let written = tx.update(updated).map_err(|e| vec![(None, e.to_string())])?;
    effects.record(Some(&stored), &written);
    response.applied_rows.push(AppliedRow {
        row_index,
        id,
        temporary_id: None,
        applied_fields,
        updated_at: written.updated_at,
    });
    Ok(())
}

fn normalize(base: &Languoid, field: LanguoidField, value: Value) -> Result<Value, String> {
    let mut scratch = base.clone();
    field
        .write(&mut scratch, value)
        .map_err(|e| e.to_string())?;
    Ok(field.read(&scratch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParentSlot;
    use crate::services::cache::InMemoryCache;
    use crate::services::closure_processor::RecordingScheduler;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        store: Arc<LanguoidStore>,
        scheduler: Arc<RecordingScheduler>,
        cache: Arc<CacheMaterializer>,
        service: BatchEditService,
    }

    fn fixture(store: Arc<LanguoidStore>) -> Fixture {
        let scheduler = Arc::new(RecordingScheduler::new());
        let cache = Arc::new(CacheMaterializer::new(
            Arc::new(InMemoryCache::new()),
            store.clone(),
            Duration::from_secs(60),
        ));
        let service = BatchEditService::new(store.clone(), scheduler.clone(), cache.clone(), 10);
        Fixture {
            store,
            scheduler,
            cache,
            service,
        }
    }

    async fn family_with_language() -> (Arc<LanguoidStore>, Languoid, Languoid) {
        let store = Arc::new(LanguoidStore::new());
        let mut tx = store.begin().await;
        let family = tx
            .insert(LanguoidDraft::new("Family", LanguoidLevel::Family).with_code("fami1234"))
            .unwrap();
        let language = tx
            .insert(
                LanguoidDraft::new("Language", LanguoidLevel::Language)
                    .with_ref(ParentSlot::Family, family.id),
            )
            .unwrap();
        tx.commit();
        (store, family, language)
    }

    fn update(id: LanguoidId, seen: DateTime<Utc>, changes: &[(LanguoidField, Value)]) -> BatchRow {
        BatchRow::Update {
            id,
            changes: changes.iter().cloned().collect(),
            client_seen_updated_at: seen,
            client_original_values: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_create_then_reference_by_temporary_id() {
        let (store, family, _) = family_with_language().await;
        let f = fixture(store);

        let request = BatchEditRequest {
            rows: vec![
                BatchRow::Create {
                    temporary_id: "tmp-sub".to_string(),
                    fields: BTreeMap::from([
                        (LanguoidField::Name, json!("Sub")),
                        (LanguoidField::Level, json!("subfamily")),
                        (LanguoidField::FamilyRef, json!(family.id.0)),
                    ]),
                },
                BatchRow::Create {
                    temporary_id: "tmp-lang".to_string(),
                    fields: BTreeMap::from([
                        (LanguoidField::Name, json!("New Tongue")),
                        (LanguoidField::Level, json!("language")),
                        (LanguoidField::FamilyRef, json!(family.id.0)),
                        (LanguoidField::PrimarySubgroupRef, json!("tmp-sub")),
                    ]),
                },
            ],
            modified_by: Some("curator".to_string()),
        };
        let response = f.service.apply(request).await.unwrap();

        let sub = response.created_ids["tmp-sub"];
        let lang = response.created_ids["tmp-lang"];
        let stored = f.store.get_languoid(lang).await.unwrap();
        assert_eq!(stored.parent_ref, Some(sub));
        assert_eq!(stored.modified_by.as_deref(), Some("curator"));
        assert_eq!(f.cache.refresh_count(), 1);

        let jobs = f.scheduler.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(
            jobs[0],
            (
                ClosureJob::Scoped {
                    ancestors: BTreeSet::from([family.id, sub, lang])
                },
                JobPriority::Normal
            )
        );
    }

    #[tokio::test]
    async fn test_up_to_date_client_applies_directly() {
        let (store, _, language) = family_with_language().await;
        let f = fixture(store);

        let response = f
            .service
            .apply(BatchEditRequest {
                rows: vec![update(
                    language.id,
                    language.updated_at,
                    &[(LanguoidField::Region, json!("Highlands"))],
                )],
                modified_by: None,
            })
            .await
            .unwrap();
        assert_eq!(response.applied_rows.len(), 1);
        assert!(response.conflicts.is_empty());
        // Descriptive change: no closure work
        assert!(f.scheduler.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_stale_client_without_originals_conflicts() {
        let (store, _, language) = family_with_language().await;
        let f = fixture(store);
        let stale = language.updated_at - chrono::Duration::seconds(5);

        let response = f
            .service
            .apply(BatchEditRequest {
                rows: vec![update(
                    language.id,
                    stale,
                    &[(LanguoidField::Notes, json!("mine"))],
                )],
                modified_by: None,
            })
            .await
            .unwrap();
        assert!(response.applied_rows.is_empty());
        assert_eq!(response.conflicts.len(), 1);
        assert!(response.conflicts[0].skipped);
        assert_eq!(f.cache.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_error_rolls_back_every_row() {
        let (store, family, language) = family_with_language().await;
        let f = fixture(store);

        let response = f
            .service
            .apply(BatchEditRequest {
                rows: vec![
                    update(family.id, family.updated_at, &[(LanguoidField::Notes, json!("ok"))]),
                    update(
                        language.id,
                        language.updated_at,
                        &[(LanguoidField::Latitude, json!(123.0))],
                    ),
                ],
                modified_by: None,
            })
            .await;

        let Err(LanguoidServiceError::BatchRejected { errors }) = response else {
            panic!("expected rejection");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row_index, 1);
        assert_eq!(errors[0].field, Some(LanguoidField::Latitude));
        assert_eq!(f.store.get_languoid(family.id).await.unwrap().notes, None);
    }

    #[tokio::test]
    async fn test_cycle_rejects_batch() {
        let (store, family, language) = family_with_language().await;
        let f = fixture(store);

        // Family re-levelled as a subfamily under its own child
        let family_under_child = update(
            family.id,
            family.updated_at,
            &[
                (LanguoidField::Level, json!("subfamily")),
                (LanguoidField::FamilyRef, json!(language.id.0)),
            ],
        );
        let result = f
            .service
            .apply(BatchEditRequest {
                rows: vec![family_under_child],
                modified_by: None,
            })
            .await;

        assert!(matches!(result, Err(LanguoidServiceError::BatchRejected { .. })));
        assert_eq!(
            f.store.get_languoid(family.id).await.unwrap().level,
            LanguoidLevel::Family
        );
    }

    #[tokio::test]
    async fn test_cycle_through_created_row_names_its_temporary_id() {
        let (store, family, _) = family_with_language().await;
        let f = fixture(store);

        let result = f
            .service
            .apply(BatchEditRequest {
                rows: vec![
                    BatchRow::Create {
                        temporary_id: "tmp".to_string(),
                        fields: BTreeMap::from([
                            (LanguoidField::Name, json!("Sub")),
                            (LanguoidField::Level, json!("subfamily")),
                            (LanguoidField::FamilyRef, json!(family.id.0)),
                        ]),
                    },
                    update(
                        family.id,
                        family.updated_at,
                        &[
                            (LanguoidField::Level, json!("subfamily")),
                            (LanguoidField::FamilyRef, json!("tmp")),
                        ],
                    ),
                ],
                modified_by: None,
            })
            .await;

        let Err(LanguoidServiceError::BatchRejected { errors }) = result else {
            panic!("expected rejection");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].row_index, 0);
        assert_eq!(errors[0].row, RowKey::Temporary("tmp".to_string()));
        assert_eq!(errors[1].row_index, 1);
        assert_eq!(errors[1].row, RowKey::Existing(family.id));
        assert_eq!(f.store.all_languoids().await.len(), 2);
    }

    #[tokio::test]
    async fn test_demoted_language_schedules_orphan_cleanup() {
        let (store, family, language) = family_with_language().await;
        let f = fixture(store);

        f.service
            .apply(BatchEditRequest {
                rows: vec![update(
                    language.id,
                    language.updated_at,
                    &[(LanguoidField::Level, json!("dialect"))],
                )],
                modified_by: None,
            })
            .await
            .unwrap();

        let jobs = f.scheduler.jobs();
        assert_eq!(
            jobs[0],
            (
                ClosureJob::OrphanCleanup {
                    former_languages: BTreeSet::from([language.id])
                },
                JobPriority::High
            )
        );
        // The language left its family: both need new closures
        assert_eq!(
            jobs[1].0,
            ClosureJob::Scoped {
                ancestors: BTreeSet::from([family.id, language.id])
            }
        );
    }

    #[tokio::test]
    async fn test_second_update_of_same_languoid_is_rejected() {
        let (store, _, language) = family_with_language().await;
        let f = fixture(store);

        let result = f
            .service
            .apply(BatchEditRequest {
                rows: vec![
                    update(
                        language.id,
                        language.updated_at,
                        &[(LanguoidField::Notes, json!("one"))],
                    ),
                    update(
                        language.id,
                        language.updated_at,
                        &[(LanguoidField::Region, json!("two"))],
                    ),
                ],
                modified_by: None,
            })
            .await;

        let Err(LanguoidServiceError::BatchRejected { errors }) = result else {
            panic!("expected rejection");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row_index, 1);
        assert!(errors[0].message.contains("already updated by row 0"));
        assert_eq!(f.store.get_languoid(language.id).await.unwrap().notes, None);
    }

    #[tokio::test]
    async fn test_oversized_batch_is_refused() {
        let (store, family, _) = family_with_language().await;
        let f = fixture(store);
        let rows = (0..11)
            .map(|_| update(family.id, family.updated_at, &[]))
            .collect();
        let result = f
            .service
            .apply(BatchEditRequest {
                rows,
                modified_by: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(LanguoidServiceError::BatchTooLarge { rows: 11, max: 10 })
        ));
    }
}
