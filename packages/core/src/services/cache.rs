//! Cache boundary and listing materialization
//!
//! The shared cache is an external collaborator; the engine only needs
//! `get`/`set`/`invalidate`. `InMemoryCache` is the in-process implementation
//! used by the CLI and tests.
//!
//! `CacheMaterializer` owns the one cached artifact the engine produces: the
//! hierarchically sorted languoid listing. Edits call `refresh()` once per
//! committed batch, never once per row.

use crate::db::LanguoidStore;
use crate::services::error::LanguoidServiceError;
use crate::services::export::hierarchical_listing;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache key of the hierarchical listing
pub const HIERARCHICAL_LISTING_KEY: &str = "languoids:hierarchical-listing";

/// Shared cache interface
#[async_trait]
pub trait CacheService: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    async fn invalidate(&self, key: &str);
}

/// In-process cache with per-entry expiry
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheService for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Some(value.clone()),
            _ => None,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires_at));
    }

    async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}

/// Invalidates and rewarms the cached hierarchical listing
pub struct CacheMaterializer {
    cache: Arc<dyn CacheService>,
    store: Arc<LanguoidStore>,
    ttl: Duration,
    refreshes: AtomicU64,
}

impl CacheMaterializer {
    pub fn new(cache: Arc<dyn CacheService>, store: Arc<LanguoidStore>, ttl: Duration) -> Self {
        Self {
            cache,
            store,
            ttl,
            refreshes: AtomicU64::new(0),
        }
    }

    /// Drop the cached listing and store a fresh one
    pub async fn refresh(&self) -> Result<(), LanguoidServiceError> {
        self.cache.invalidate(HIERARCHICAL_LISTING_KEY).await;

        let languoids = self.store.all_languoids().await;
        let listing = hierarchical_listing(&languoids);
        let value = serde_json::to_value(&listing)
            .map_err(|e| LanguoidServiceError::serialization_error(e.to_string()))?;
        self.cache
            .set(HIERARCHICAL_LISTING_KEY, value, self.ttl)
            .await;

        let count = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            "Rewarmed hierarchical listing ({} languoids, refresh #{})",
            listing.len(),
            count
        );
        Ok(())
    }

    /// Number of completed refreshes
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }
}
