//! LanguoidStore - transactional in-memory store
//!
//! The relational database behind the catalog is an external collaborator;
//! this store is the reference backend the engine runs against. It provides
//! the two guarantees the hierarchy engine relies on:
//!
//! - **Atomic transactions**: a `StoreTransaction` stages every write on a
//!   private copy of the table. `commit()` publishes the copy in one step;
//!   dropping the transaction discards it. Readers never observe a partially
//!   applied import or batch.
//! - **Monotonic versions**: every write stamps `updated_at` with a value
//!   strictly greater than any previous stamp, so optimistic-concurrency
//!   comparisons never see two writes with the same version.
//!
//! Writers are serialized by the table lock, which is held only for the
//! duration of one transaction, never across a client round-trip.
//!
//! The closure table (materialized descendant sets) is kept beside the
//! languoid table and written by the closure processor outside edit
//! transactions, so it may briefly lag `parent_ref`.

use crate::db::error::DatabaseError;
use crate::db::events::DomainEvent;
use crate::models::{Languoid, LanguoidDraft, LanguoidId};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{broadcast, OwnedRwLockWriteGuard, RwLock};

/// Broadcast channel capacity for domain events.
///
/// Bulk imports emit one event per written languoid; lagging subscribers
/// only miss history, not current state.
const DOMAIN_EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Default)]
struct StoreState {
    languoids: BTreeMap<LanguoidId, Languoid>,
    code_index: HashMap<String, LanguoidId>,
    next_id: i64,
    last_stamp: Option<DateTime<Utc>>,
}

impl StoreState {
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn allocate_id(&mut self) -> LanguoidId {
        self.next_id += 1;
        LanguoidId(self.next_id)
    }

    fn check_code_free(&self, code: Option<&str>, owner: LanguoidId) -> Result<(), DatabaseError> {
        if let Some(code) = code {
            if let Some(existing) = self.code_index.get(code) {
                if *existing != owner {
                    return Err(DatabaseError::duplicate_code(code, *existing));
                }
            }
        }
        Ok(())
    }
}

/// Transactional languoid store
pub struct LanguoidStore {
    state: Arc<RwLock<StoreState>>,
    closures: RwLock<HashMap<LanguoidId, BTreeSet<LanguoidId>>>,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl Default for LanguoidStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguoidStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(DOMAIN_EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            closures: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Create a store pre-loaded with previously persisted languoids
    ///
    /// Ids are kept as given; new ids continue after the largest one.
    /// Fails if two languoids share an id or a code.
    pub fn with_languoids(languoids: Vec<Languoid>) -> Result<Self, DatabaseError> {
        let mut state = StoreState::default();
        for languoid in languoids {
            if state.languoids.contains_key(&languoid.id) {
                return Err(DatabaseError::transaction_failed(format!(
                    "duplicate languoid id {} in snapshot",
                    languoid.id
                )));
            }
            state.check_code_free(languoid.code.as_deref(), languoid.id)?;
            if let Some(code) = &languoid.code {
                state.code_index.insert(code.clone(), languoid.id);
            }
            state.next_id = state.next_id.max(languoid.id.0);
            state.last_stamp = state.last_stamp.max(Some(languoid.updated_at));
            state.languoids.insert(languoid.id, languoid);
        }

        let (event_tx, _) = broadcast::channel(DOMAIN_EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            closures: RwLock::new(HashMap::new()),
            event_tx,
        })
    }

    /// Subscribe to domain events emitted after commits
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Begin a transaction
    ///
    /// Waits for any in-flight transaction to finish. Reads through the
    /// returned handle see the transaction's own staged writes.
    pub async fn begin(&self) -> StoreTransaction {
        let guard = self.state.clone().write_owned().await;
        let staged = guard.clone();
        StoreTransaction {
            guard,
            staged,
            events: Vec::new(),
            event_tx: self.event_tx.clone(),
        }
    }

    pub async fn get_languoid(&self, id: LanguoidId) -> Option<Languoid> {
        self.state.read().await.languoids.get(&id).cloned()
    }

    pub async fn find_by_code(&self, code: &str) -> Option<Languoid> {
        let state = self.state.read().await;
        state
            .code_index
            .get(code)
            .and_then(|id| state.languoids.get(id))
            .cloned()
    }

    /// Every committed languoid, ordered by id
    pub async fn all_languoids(&self) -> Vec<Languoid> {
        self.state.read().await.languoids.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.languoids.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Materialized descendant set of a languoid (empty if never built)
    pub async fn descendants_of(&self, id: LanguoidId) -> BTreeSet<LanguoidId> {
        self.closures
            .read()
            .await
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the whole closure table
    ///
    /// Entries for languoids no longer in the store are dropped.
    pub async fn replace_closures(&self, closures: HashMap<LanguoidId, BTreeSet<LanguoidId>>) {
        let live: BTreeSet<LanguoidId> =
            self.state.read().await.languoids.keys().copied().collect();
        let mut table = self.closures.write().await;
        *table = closures
            .into_iter()
            .filter(|(id, _)| live.contains(id))
            .collect();
        let count = table.len();
        drop(table);

        let _ = self.event_tx.send(DomainEvent::ClosuresRebuilt { count, full: true });
    }

    /// Overwrite the closure entries of the given languoids
    ///
    /// Ids that have since been deleted are skipped, and their stale entries
    /// removed.
    pub async fn merge_closures(&self, closures: HashMap<LanguoidId, BTreeSet<LanguoidId>>) {
        let live: BTreeSet<LanguoidId> =
            self.state.read().await.languoids.keys().copied().collect();
        let mut table = self.closures.write().await;
        let mut count = 0;
        for (id, descendants) in closures {
            if live.contains(&id) {
                table.insert(id, descendants);
                count += 1;
            } else {
                table.remove(&id);
            }
        }
        drop(table);

        let _ = self
            .event_tx
            .send(DomainEvent::ClosuresRebuilt { count, full: false });
    }
}

/// An open transaction over the languoid table
///
/// Dropping the transaction without calling [`StoreTransaction::commit`]
/// rolls it back.
pub struct StoreTransaction {
    guard: OwnedRwLockWriteGuard<StoreState>,
    staged: StoreState,
    events: Vec<DomainEvent>,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl StoreTransaction {
    pub fn get(&self, id: LanguoidId) -> Option<&Languoid> {
        self.staged.languoids.get(&id)
    }

    pub fn contains(&self, id: LanguoidId) -> bool {
        self.staged.languoids.contains_key(&id)
    }

    pub fn find_by_code(&self, code: &str) -> Option<&Languoid> {
        self.staged
            .code_index
            .get(code)
            .and_then(|id| self.staged.languoids.get(id))
    }

    /// Every languoid visible to this transaction, ordered by id
    pub fn languoids(&self) -> impl Iterator<Item = &Languoid> {
        self.staged.languoids.values()
    }

    pub fn len(&self) -> usize {
        self.staged.languoids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.languoids.is_empty()
    }

    /// Insert a new languoid, assigning its id and version
    pub fn insert(&mut self, draft: LanguoidDraft) -> Result<Languoid, DatabaseError> {
        let id = self.staged.allocate_id();
        self.staged.check_code_free(draft.code.as_deref(), id)?;

        let stamp = self.staged.next_stamp();
        let languoid = draft.into_languoid(id, stamp);
        if let Some(code) = &languoid.code {
            self.staged.code_index.insert(code.clone(), id);
        }
        self.staged.languoids.insert(id, languoid.clone());
        self.events.push(DomainEvent::LanguoidCreated {
            languoid: languoid.clone(),
        });
        Ok(languoid)
    }

    /// Write a modified languoid, re-deriving its parent and bumping its version
    pub fn update(&mut self, mut languoid: Languoid) -> Result<Languoid, DatabaseError> {
        let previous_code = match self.staged.languoids.get(&languoid.id) {
            Some(existing) => existing.code.clone(),
            None => return Err(DatabaseError::unknown_languoid(languoid.id)),
        };
        self.staged
            .check_code_free(languoid.code.as_deref(), languoid.id)?;

        if previous_code != languoid.code {
            if let Some(old) = &previous_code {
                self.staged.code_index.remove(old);
            }
            if let Some(new) = &languoid.code {
                self.staged.code_index.insert(new.clone(), languoid.id);
            }
        }

        languoid.recompute_parent();
        languoid.updated_at = self.staged.next_stamp();
        self.staged
            .languoids
            .insert(languoid.id, languoid.clone());
        self.events.push(DomainEvent::LanguoidUpdated {
            languoid: languoid.clone(),
        });
        Ok(languoid)
    }

    /// Remove a languoid; callers enforce the no-dependents rule
    pub fn delete(&mut self, id: LanguoidId) -> Result<Languoid, DatabaseError> {
        let removed = self
            .staged
            .languoids
            .remove(&id)
            .ok_or_else(|| DatabaseError::unknown_languoid(id))?;
        if let Some(code) = &removed.code {
            self.staged.code_index.remove(code);
        }
        self.events.push(DomainEvent::LanguoidDeleted { id });
        Ok(removed)
    }

    /// Publish every staged write atomically and emit their events
    pub fn commit(self) -> Vec<DomainEvent> {
        let StoreTransaction {
            mut guard,
            staged,
            events,
            event_tx,
        } = self;
        *guard = staged;
        drop(guard);

        for event in &events {
            let _ = event_tx.send(event.clone());
        }
        events
    }

    /// Discard every staged write
    pub fn rollback(self) {
        tracing::debug!(
            "Rolling back transaction with {} staged change(s)",
            self.events.len()
        );
    }
}
