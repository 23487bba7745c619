//! Background Closure Processor
//!
//! Runs closure-table maintenance off the edit-commit path:
//! - Full rebuilds after a bulk import
//! - Scoped rebuilds of the affected ancestors after a batch edit or delete
//! - Dialect-orphan cleanup when a languoid stops being a language
//!
//! ## Event-Driven Model with Coalescing
//!
//! The processor sleeps until a job arrives. On wake it waits a short debounce
//! window, then drains every queued job and merges them:
//!
//! 1. Orphan cleanups are unioned and run first, since they change `parent_ref`
//! 2. A queued full rebuild supersedes every scoped rebuild
//! 3. Otherwise all scoped ancestor sets are unioned into one rebuild
//!
//! Rapid, overlapping batch edits therefore cost one recomputation. Closure
//! building is idempotent, so coalescing only saves work.
//!
//! Orphan cleanup rewrites stored rows after the editing batch has already
//! refreshed the cached listing. When a processor is given a
//! `CacheMaterializer`, it refreshes the listing again after any cleanup that
//! detached a dialect.
//!
//! ## Waiting for completion
//!
//! `flush()` resolves once every job scheduled before the call has been
//! processed. Tests and the CLI use it to observe settled closures.

use crate::db::LanguoidStore;
use crate::hierarchy::{ClosureBuilder, HierarchyIndex};
use crate::models::{LanguoidId, LanguoidLevel, ParentSlot};
use crate::services::cache::CacheMaterializer;
use crate::services::error::LanguoidServiceError;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Closure maintenance work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosureJob {
    /// Recompute the descendant set of every languoid
    FullRebuild,

    /// Recompute the descendant sets of exactly these languoids
    Scoped { ancestors: BTreeSet<LanguoidId> },

    /// Detach dialects whose enclosing language is no longer a language
    OrphanCleanup { former_languages: BTreeSet<LanguoidId> },
}

impl ClosureJob {
    pub fn name(&self) -> &'static str {
        match self {
            ClosureJob::FullRebuild => "full-rebuild",
            ClosureJob::Scoped { .. } => "scoped-rebuild",
            ClosureJob::OrphanCleanup { .. } => "orphan-cleanup",
        }
    }
}

/// Relative urgency of a scheduled job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobPriority {
    Low,
    Normal,
    High,
}

/// Asynchronous executor boundary used by the import and batch services
pub trait JobScheduler: Send + Sync {
    fn schedule(&self, job: ClosureJob, priority: JobPriority);
}

/// Cloneable handle for scheduling jobs on a running `ClosureProcessor`
#[derive(Clone)]
pub struct ClosureProcessorHandle {
    job_tx: mpsc::UnboundedSender<(ClosureJob, JobPriority)>,
    requested: Arc<AtomicU64>,
    completed_rx: watch::Receiver<u64>,
}

impl JobScheduler for ClosureProcessorHandle {
    fn schedule(&self, job: ClosureJob, priority: JobPriority) {
        self.requested.fetch_add(1, Ordering::SeqCst);
        let name = job.name();
        match self.job_tx.send((job, priority)) {
            Ok(()) => tracing::debug!("Scheduled {} job ({:?})", name, priority),
            Err(_) => {
                self.requested.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!("ClosureProcessor has shut down, {} job dropped", name);
            }
        }
    }
}

impl ClosureProcessorHandle {
    /// Wait until every job scheduled so far has been processed
    pub async fn flush(&self) {
        let target = self.requested.load(Ordering::SeqCst);
        let mut completed = self.completed_rx.clone();
        if completed.wait_for(|done| *done >= target).await.is_err() {
            tracing::warn!("ClosureProcessor stopped before flushing");
        }
    }
}

/// Work merged from one drain of the queue
#[derive(Debug, Default)]
struct PendingWork {
    jobs: u64,
    highest: Option<JobPriority>,
    full: bool,
    scoped: BTreeSet<LanguoidId>,
    former_languages: BTreeSet<LanguoidId>,
}

impl PendingWork {
    fn add(&mut self, job: ClosureJob, priority: JobPriority) {
        self.jobs += 1;
        self.highest = self.highest.max(Some(priority));
        match job {
            ClosureJob::FullRebuild => self.full = true,
            ClosureJob::Scoped { ancestors } => self.scoped.extend(ancestors),
            ClosureJob::OrphanCleanup { former_languages } => {
                self.former_languages.extend(former_languages)
            }
        }
    }
}

/// Background task owner for closure maintenance
///
/// Dropping the processor stops the background task after its current run.
pub struct ClosureProcessor {
    handle: ClosureProcessorHandle,
    _shutdown_tx: mpsc::Sender<()>,
}

impl ClosureProcessor {
    /// Create and start the processor
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<LanguoidStore>, debounce: Duration) -> Self {
        Self::spawn(store, debounce, None)
    }

    /// Create and start a processor that keeps the cached listing current
    pub fn with_cache(
        store: Arc<LanguoidStore>,
        debounce: Duration,
        cache: Arc<CacheMaterializer>,
    ) -> Self {
        Self::spawn(store, debounce, Some(cache))
    }

    fn spawn(
        store: Arc<LanguoidStore>,
        debounce: Duration,
        cache: Option<Arc<CacheMaterializer>>,
    ) -> Self {
        tracing::info!("ClosureProcessor initializing (debounce {:?})", debounce);

        let (job_tx, mut job_rx) = mpsc::unbounded_channel::<(ClosureJob, JobPriority)>();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (completed_tx, completed_rx) = watch::channel(0u64);

        tokio::spawn(async move {
            let mut completed = 0u64;
            loop {
                tokio::select! {
                    biased; // Check shutdown first

                    _ = shutdown_rx.recv() => {
                        tracing::info!("ClosureProcessor shutting down");
                        break;
                    }

                    Some((job, priority)) = job_rx.recv() => {
                        if !debounce.is_zero() {
                            tokio::time::sleep(debounce).await;
                        }

                        let mut work = PendingWork::default();
                        work.add(job, priority);
                        // Coalesce everything that arrived during the debounce window
                        while let Ok((job, priority)) = job_rx.try_recv() {
                            work.add(job, priority);
                        }
                        tracing::debug!(
                            "ClosureProcessor woken: {} job(s) coalesced, highest priority {:?}",
                            work.jobs,
                            work.highest
                        );

                        completed += work.jobs;
                        match Self::run(&store, work).await {
                            Ok(true) => {
                                if let Some(cache) = &cache {
                                    if let Err(e) = cache.refresh().await {
                                        tracing::warn!(
                                            "Cache refresh after orphan cleanup failed: {}",
                                            e
                                        );
                                    }
                                }
                            }
                            Ok(false) => {}
                            Err(e) => tracing::error!("Closure maintenance failed: {}", e),
                        }
                        let _ = completed_tx.send(completed);
                    }
                }
            }
        });

        Self {
            handle: ClosureProcessorHandle {
                job_tx,
                requested: Arc::new(AtomicU64::new(0)),
                completed_rx,
            },
            _shutdown_tx: shutdown_tx,
        }
    }

    /// Get a cloneable scheduling handle
    pub fn handle(&self) -> ClosureProcessorHandle {
        self.handle.clone()
    }

    pub fn schedule(&self, job: ClosureJob, priority: JobPriority) {
        self.handle.schedule(job, priority);
    }

    pub async fn flush(&self) {
        self.handle.flush().await;
    }

    /// Run one merged batch of work
    ///
    /// Returns true when orphan cleanup rewrote stored rows.
    async fn run(
        store: &LanguoidStore,
        mut work: PendingWork,
    ) -> Result<bool, LanguoidServiceError> {
        let mut rows_changed = false;
        if !work.former_languages.is_empty() {
            let touched = Self::detach_orphaned_dialects(store, &work.former_languages).await?;
            rows_changed = !touched.is_empty();
            work.scoped.extend(touched);
        }

        let languoids = store.all_languoids().await;
        let index = HierarchyIndex::from_languoids(&languoids);
        let builder = ClosureBuilder::new(&index);

        if work.full {
            let table = builder.full();
            tracing::info!("Full closure rebuild over {} languoids", table.len());
            store.replace_closures(table).await;
        } else if !work.scoped.is_empty() {
            let mut table = builder.scoped(&work.scoped);
            // Deleted ids get an empty entry so the store drops their rows
            for id in &work.scoped {
                table.entry(*id).or_default();
            }
            tracing::debug!(
                "Scoped closure rebuild of {} languoid(s) ({} requested)",
                table.len(),
                work.scoped.len()
            );
            store.merge_closures(table).await;
        }
        Ok(rows_changed)
    }

    /// Clear `language_ref` on dialects whose language changed level
    ///
    /// Returns the languoids whose descendant sets lost members: each former
    /// language and its ancestors.
    async fn detach_orphaned_dialects(
        store: &LanguoidStore,
        former_languages: &BTreeSet<LanguoidId>,
    ) -> Result<BTreeSet<LanguoidId>, LanguoidServiceError> {
        let mut tx = store.begin().await;

        // Skip ids that were deleted or turned back into languages meanwhile
        let still_former: BTreeSet<LanguoidId> = former_languages
            .iter()
            .copied()
            .filter(|id| {
                tx.get(*id)
                    .map(|l| l.level != LanguoidLevel::Language)
                    .unwrap_or(false)
            })
            .collect();

        let orphans: Vec<_> = tx
            .languoids()
            .filter(|l| l.level == LanguoidLevel::Dialect)
            .filter(|l| l.language_ref.is_some_and(|r| still_former.contains(&r)))
            .cloned()
            .collect();

        if orphans.is_empty() {
            tx.rollback();
            return Ok(BTreeSet::new());
        }

        let index = HierarchyIndex::from_languoids(tx.languoids());
        let mut touched = BTreeSet::new();
        for id in &still_former {
            touched.insert(*id);
            touched.extend(index.ancestors(*id));
        }

        for mut dialect in orphans {
            tracing::info!(
                "Detaching dialect {} from former language {:?}",
                dialect.describe(),
                dialect.language_ref
            );
            dialect.set_slot(ParentSlot::Language, None);
            tx.update(dialect)?;
        }
        tx.commit();
        Ok(touched)
    }
}

/// Scheduler that records jobs instead of running them
///
/// For tests and tools that drive closure maintenance themselves.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    jobs: std::sync::Mutex<Vec<(ClosureJob, JobPriority)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs scheduled so far, in order
    pub fn jobs(&self) -> Vec<(ClosureJob, JobPriority)> {
        self.jobs
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_default()
    }
}

impl JobScheduler for RecordingScheduler {
    fn schedule(&self, job: ClosureJob, priority: JobPriority) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push((job, priority));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguoidDraft;

    async fn seeded_store() -> (Arc<LanguoidStore>, LanguoidId, LanguoidId, LanguoidId) {
        let store = Arc::new(LanguoidStore::new());
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
        let dialect = tx
            .insert(
                LanguoidDraft::new("Dialect", LanguoidLevel::Dialect)
                    .with_ref(ParentSlot::Family, family.id)
                    .with_ref(ParentSlot::Language, language.id),
            )
            .unwrap();
        tx.commit();
        (store, family.id, language.id, dialect.id)
    }

    #[tokio::test]
    async fn test_full_rebuild_populates_closures() {
        let (store, family, language, dialect) = seeded_store().await;
        let processor = ClosureProcessor::new(store.clone(), Duration::ZERO);

        processor.schedule(ClosureJob::FullRebuild, JobPriority::Low);
        processor.flush().await;

        assert_eq!(
            store.descendants_of(family).await,
            BTreeSet::from([language, dialect])
        );
        assert_eq!(store.descendants_of(language).await, BTreeSet::from([dialect]));
    }

    #[tokio::test]
    async fn test_coalesced_jobs_all_complete() {
        let (store, family, language, _) = seeded_store().await;
        let processor = ClosureProcessor::new(store.clone(), Duration::from_millis(20));
        let handle = processor.handle();

        for _ in 0..5 {
            handle.schedule(
                ClosureJob::Scoped {
                    ancestors: BTreeSet::from([family]),
                },
                JobPriority::Normal,
            );
        }
        handle.schedule(
            ClosureJob::Scoped {
                ancestors: BTreeSet::from([language]),
            },
            JobPriority::Normal,
        );
        handle.flush().await;

        assert_eq!(store.descendants_of(family).await.len(), 2);
        assert_eq!(store.descendants_of(language).await.len(), 1);
    }

    #[tokio::test]
    async fn test_orphan_cleanup_detaches_dialects() {
        let (store, family, language, dialect) = seeded_store().await;

        let mut tx = store.begin().await;
        let mut demoted = tx.get(language).cloned().unwrap();
        demoted.level = LanguoidLevel::Dialect;
        tx.update(demoted).unwrap();
        tx.commit();

        let processor = ClosureProcessor::new(store.clone(), Duration::ZERO);
        processor.schedule(ClosureJob::FullRebuild, JobPriority::Low);
        processor.schedule(
            ClosureJob::OrphanCleanup {
                former_languages: BTreeSet::from([language]),
            },
            JobPriority::High,
        );
        processor.flush().await;

        let orphan = store.get_languoid(dialect).await.unwrap();
        assert_eq!(orphan.language_ref, None);
        assert_eq!(orphan.parent_ref, None);
        assert!(!store.descendants_of(family).await.contains(&dialect));
    }

    #[test]
    fn test_recording_scheduler_keeps_order() {
        let scheduler = RecordingScheduler::new();
        scheduler.schedule(ClosureJob::FullRebuild, JobPriority::Low);
        scheduler.schedule(
            ClosureJob::Scoped {
                ancestors: BTreeSet::new(),
            },
            JobPriority::Normal,
        );
        let jobs = scheduler.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].0, ClosureJob::FullRebuild);
        assert_eq!(jobs[1].1, JobPriority::Normal);
    }
}
