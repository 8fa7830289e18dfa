//! Memoisation cache for provider result streams.
//!
//! Maps an exact `(provider, term, location, limit)` key to the stream a
//! provider returned for it. Lookups never fold case or trim whitespace:
//! a stream is only ever reused for the identical input. Uses [`moka`] for
//! bounded capacity and TTL-based eviction.
//!
//! The cache is owned by the caller and passed into each aggregation run;
//! there is no process-wide instance.

use std::fmt;
use std::time::Duration;

use moka::future::Cache;

use crate::config::SourceConfig;
use crate::types::{ListingQuery, ProviderKind, Record};

/// Exact-match cache key for one provider call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    provider: ProviderKind,
    term: String,
    location: String,
    limit: usize,
}

impl CacheKey {
    /// Build the key for `provider.fetch(query, limit)`.
    pub fn new(provider: ProviderKind, query: &ListingQuery, limit: usize) -> Self {
        Self {
            provider,
            term: query.term.clone(),
            location: query.location.clone(),
            limit,
        }
    }
}

/// Bounded, TTL-evicting store of previously fetched result streams.
///
/// Cloning is cheap and clones share storage.
#[derive(Clone)]
pub struct StreamCache {
    inner: Option<Cache<CacheKey, Vec<Record>>>,
}

impl StreamCache {
    /// Create an enabled cache holding at most `capacity` streams for `ttl`.
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Some(
                Cache::builder()
                    .max_capacity(capacity)
                    .time_to_live(ttl)
                    .build(),
            ),
        }
    }

    /// Create a cache whose lookups always miss and whose populates are
    /// dropped.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Build from config. A zero TTL or zero capacity disables caching.
    pub fn from_config(config: &SourceConfig) -> Self {
        if config.cache_ttl_seconds == 0 || config.cache_capacity == 0 {
            Self::disabled()
        } else {
            Self::new(
                config.cache_capacity,
                Duration::from_secs(config.cache_ttl_seconds),
            )
        }
    }

    /// Whether this cache stores anything at all.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Return the stream previously stored under exactly `key`.
    pub async fn lookup(&self, key: &CacheKey) -> Option<Vec<Record>> {
        let cache = self.inner.as_ref()?;
        cache.get(key).await
    }

    /// Store a successfully fetched stream under `key`.
    pub async fn populate(&self, key: CacheKey, stream: Vec<Record>) {
        if let Some(cache) = &self.inner {
            cache.insert(key, stream).await;
        }
    }
}

impl fmt::Debug for StreamCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
