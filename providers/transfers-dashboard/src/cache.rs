//! Query result cache
//!
//! Whole result sets keyed by the requested date range (`None` is the
//! unfiltered query). Bounded by capacity (least recently used entry is
//! evicted) and by time-to-live. Failed fetches are never stored.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use warehouse_common::{DateRange, TransferRecord, WarehouseError};

use crate::config::CacheConfig;
use crate::error::DashboardError;

/// Cache key: the query parameters
pub type CacheKey = Option<DateRange>;

/// Shared, immutable result set
pub type TransferSet = Arc<Vec<TransferRecord>>;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct CachedResult {
    records: TransferSet,
    fetched_at: Instant,
}

struct CacheInner {
    entries: LruCache<CacheKey, CachedResult>,
    stats: CacheStats,
}

/// Capacity- and TTL-bounded cache of transfer query results
pub struct QueryCache {
    inner: Mutex<CacheInner>,
    ttl: Duration,
}

impl QueryCache {
    /// Create a new cache
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, DashboardError> {
        Ok(Self::new(config.capacity()?, config.ttl()))
    }

    /// Fresh cached result for `key`, dropping it if expired
    pub async fn get(&self, key: &CacheKey) -> Option<TransferSet> {
        let mut inner = self.inner.lock().await;

        let expired = inner
            .entries
            .peek(key)
            .map(|entry| entry.fetched_at.elapsed() >= self.ttl);
        let fresh = match expired {
            Some(false) => inner
                .entries
                .get(key)
                .map(|entry| Arc::clone(&entry.records)),
            Some(true) => {
                inner.entries.pop(key);
                None
            }
            None => None,
        };

        match fresh {
            Some(_) => inner.stats.hits += 1,
            None => inner.stats.misses += 1,
        }
        inner.stats.entries = inner.entries.len();
        fresh
    }

    /// Store a result set
    pub async fn insert(&self, key: CacheKey, records: TransferSet) {
        let mut inner = self.inner.lock().await;
        inner.entries.put(
            key,
            CachedResult {
                records,
                fetched_at: Instant::now(),
            },
        );
        inner.stats.entries = inner.entries.len();
    }

    /// Cached result for `key`, or run `fetch` and cache its success.
    ///
    /// The lock is not held while fetching.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: CacheKey,
        fetch: F,
    ) -> Result<TransferSet, WarehouseError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<TransferRecord>, WarehouseError>>,
    {
        if let Some(records) = self.get(&key).await {
            debug!("Cache hit for {:?} ({} rows)", key, records.len());
            return Ok(records);
        }

        let records = Arc::new(fetch().await?);
        self.insert(key, Arc::clone(&records)).await;
        debug!("Cache stats: {:?}", self.stats().await);
        Ok(records)
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.lock().await.stats
    }
}
