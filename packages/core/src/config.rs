//! Catalog Configuration
//!
//! Tunables for the import, batch-edit and closure services. Defaults suit a
//! single-process deployment; binaries override them through `LANGUOID_*`
//! environment variables.
//!
//! | Variable                        | Field                  | Default |
//! |---------------------------------|------------------------|---------|
//! | `LANGUOID_MAX_BATCH_ROWS`       | `max_batch_rows`       | 500     |
//! | `LANGUOID_CLOSURE_DEBOUNCE_MS`  | `closure_debounce_ms`  | 50      |
//! | `LANGUOID_CACHE_TTL_SECS`       | `cache_ttl_secs`       | 300     |
//! | `LANGUOID_PSEUDO_CODE_FALLBACK` | `pseudo_code_fallback` | `xxxx`  |

use crate::hierarchy::DEFAULT_FALLBACK_PREFIX;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration shared by the catalog services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Maximum number of rows in one batch-edit request
    pub max_batch_rows: usize,

    /// Delay after a closure job arrives before the processor drains its queue
    pub closure_debounce_ms: u64,

    /// Lifetime of the rewarmed hierarchical listing in the cache
    pub cache_ttl_secs: u64,

    /// Placeholder-code prefix for names without any letters
    pub pseudo_code_fallback: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_batch_rows: 500,
            closure_debounce_ms: 50,
            cache_ttl_secs: 300,
            pseudo_code_fallback: DEFAULT_FALLBACK_PREFIX.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Defaults overridden by any `LANGUOID_*` variables that are set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            max_batch_rows: parse_or(&lookup, "LANGUOID_MAX_BATCH_ROWS", defaults.max_batch_rows),
            closure_debounce_ms: parse_or(
                &lookup,
                "LANGUOID_CLOSURE_DEBOUNCE_MS",
                defaults.closure_debounce_ms,
            ),
            cache_ttl_secs: parse_or(&lookup, "LANGUOID_CACHE_TTL_SECS", defaults.cache_ttl_secs),
            pseudo_code_fallback: lookup("LANGUOID_PSEUDO_CODE_FALLBACK")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.pseudo_code_fallback),
        }
    }

    pub fn closure_debounce(&self) -> Duration {
        Duration::from_millis(self.closure_debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value '{}' for {}", raw, key);
            default
        }),
    }
}
