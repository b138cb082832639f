//! Cache seam for list results, plus an in-memory LRU implementation.

use crate::error::ModelError;
use async_trait::async_trait;
use lru::LruCache;
use serde_json::Value;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Deferred load handed to a cache on a miss.
pub type Loader<'a> = Pin<Box<dyn Future<Output = Result<Value, ModelError>> + Send + 'a>>;

/// Opaque cache used by list handlers. Implementations decide storage and expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Cached value for `key`, or the result of `loader` (stored on success).
    async fn get_or_load(&self, key: &str, loader: Loader<'_>) -> Result<Value, ModelError>;
}

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// LRU-bounded cache with optional TTL. Expired entries are dropped lazily on access.
#[derive(Debug)]
pub struct MemoryCache {
    store: Mutex<LruCache<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    /// `max_entries` of zero is treated as one.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Mutex::new(LruCache::new(capacity)),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub async fn invalidate(&self, key: &str) {
        self.store.lock().await.pop(key);
    }

    pub async fn clear(&self) {
        self.store.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_or_load(&self, key: &str, loader: Loader<'_>) -> Result<Value, ModelError> {
        {
            let mut store = self.store.lock().await;
            let cached = store.get(key).map(|e| (e.is_expired(), e.value.clone()));
            match cached {
                Some((true, _)) => {
                    store.pop(key);
                }
                Some((false, value)) => {
                    tracing::debug!(key, "cache hit");
                    return Ok(value);
                }
                None => {}
            }
        }
        // The lock is not held across the load; concurrent misses may both load.
        let value = loader.await?;
        let entry = CacheEntry {
            value: value.clone(),
            expires_at: self.ttl.map(|d| Instant::now() + d),
        };
        self.store.lock().await.put(key.to_string(), entry);
        Ok(value)
    }
}
