//! Response-observation hooks attached to the outbound origin call.

use async_trait::async_trait;
use rcache_store::{AbstractCacheStore, CacheKey, CachedResponse};
use tracing::{debug, warn};

use crate::invalidate::Invalidator;

/// Observes the origin's response after it has been fully received and
/// before it is relayed to the client.
///
/// Implementations must never fail the request: a cache problem degrades
/// the response to "served uncached", nothing more.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn observe(&self, path: &str, response: &CachedResponse);
}

/// Writes successful cacheable responses into the store.
pub struct CachePopulate {
    store: AbstractCacheStore,
}

impl CachePopulate {
    pub fn new(store: AbstractCacheStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Interceptor for CachePopulate {
    async fn observe(&self, path: &str, response: &CachedResponse) {
        if response.status != 200 {
            return;
        }
        let Some(cache_key) = CacheKey::from_path(path) else {
            return;
        };
        match self
            .store
            .put(&cache_key.bucket, &cache_key.key, response)
            .await
        {
            Ok(()) => {
                debug!(bucket = %cache_key.bucket, key = %cache_key.key, "cached")
            }
            Err(err) => {
                warn!(%err, path, "cache write failed, response served uncached")
            }
        }
    }
}

/// Drops the cache entry matching a mutation the origin has confirmed.
pub struct Invalidate {
    invalidator: Invalidator,
}

impl Invalidate {
    pub fn new(store: AbstractCacheStore) -> Self {
        Self {
            invalidator: Invalidator::new(store),
        }
    }
}

#[async_trait]
impl Interceptor for Invalidate {
    async fn observe(&self, path: &str, _response: &CachedResponse) {
        let Some(cache_key) = CacheKey::from_path(path) else {
            return;
        };
        match self
            .invalidator
            .invalidate_key(&cache_key.bucket, &cache_key.key)
            .await
        {
            Ok(()) => {
                debug!(bucket = %cache_key.bucket, key = %cache_key.key, "invalidated")
            }
            Err(err) => warn!(%err, path, "cache invalidation failed"),
        }
    }
}

/// No-op, for routes that are forwarded but never cached nor invalidated.
pub struct PassThrough;

#[async_trait]
impl Interceptor for PassThrough {
    async fn observe(&self, _path: &str, _response: &CachedResponse) {}
}
