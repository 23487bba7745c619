//! Catalog wiring
//!
//! `LanguoidCatalog` owns one store, its closure processor and the listing
//! cache, and hands out the import, batch-edit and maintenance services
//! already connected to them. Binaries and integration tests build one of
//! these instead of wiring the services by hand.

use crate::config::CatalogConfig;
use crate::db::LanguoidStore;
use crate::services::batch_edit_service::BatchEditService;
use crate::services::cache::{CacheMaterializer, CacheService, InMemoryCache};
use crate::services::closure_processor::{ClosureProcessor, JobScheduler};
use crate::services::import_service::ImportService;
use crate::services::maintenance::MaintenanceService;
use std::sync::Arc;

/// A store with its background closure maintenance and cache
pub struct LanguoidCatalog {
    store: Arc<LanguoidStore>,
    processor: ClosureProcessor,
    cache: Arc<CacheMaterializer>,
    import: ImportService,
    batch_edit: BatchEditService,
    maintenance: MaintenanceService,
}

impl LanguoidCatalog {
    /// Wire the services over `store` with an in-process cache
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: Arc<LanguoidStore>, config: CatalogConfig) -> Self {
        Self::with_cache(store, Arc::new(InMemoryCache::new()), config)
    }

    /// Wire the services over `store` with a shared cache
    pub fn with_cache(
        store: Arc<LanguoidStore>,
        cache: Arc<dyn CacheService>,
        config: CatalogConfig,
    ) -> Self {
        let cache = Arc::new(CacheMaterializer::new(
            cache,
            store.clone(),
            config.cache_ttl(),
        ));
        let processor =
            ClosureProcessor::with_cache(store.clone(), config.closure_debounce(), cache.clone());
        let scheduler: Arc<dyn JobScheduler> = Arc::new(processor.handle());

        let import = ImportService::new(store.clone(), scheduler.clone(), config.clone());
        let batch_edit = BatchEditService::new(
            store.clone(),
            scheduler.clone(),
            cache.clone(),
            config.max_batch_rows,
        );
        let maintenance = MaintenanceService::new(store.clone(), scheduler, cache.clone());

        Self {
            store,
            processor,
            cache,
            import,
            batch_edit,
            maintenance,
        }
    }

    pub fn store(&self) -> &Arc<LanguoidStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<CacheMaterializer> {
        &self.cache
    }

    pub fn import_service(&self) -> &ImportService {
        &self.import
    }

    pub fn batch_edit_service(&self) -> &BatchEditService {
        &self.batch_edit
    }

    pub fn maintenance(&self) -> &MaintenanceService {
        &self.maintenance
    }

    /// Wait for every closure job scheduled so far
    pub async fn settle(&self) {
        self.processor.flush().await;
    }
}
