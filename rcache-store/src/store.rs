//! Capability-set trait over the cache backend.
//!
//! Every operation fails soft: a backend problem surfaces as a
//! [`StoreError`] value for the caller to degrade on, never as a panic.

use async_trait::async_trait;
use std::sync::Arc;

use crate::{CachedResponse, StoreError};

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a cached response. A corrupt stored entry is deleted
    /// best-effort and reported as a miss.
    async fn get(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<CachedResponse>, StoreError>;

    /// Write an entry, replacing any previous one, and register the bucket
    /// in the bucket index as part of the same write.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        entry: &CachedResponse,
    ) -> Result<(), StoreError>;

    /// Drop a single entry. Deleting an absent entry is a no-op.
    async fn delete_key(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Add a bucket to the bucket index. Idempotent.
    async fn register_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Namespaced names of every bucket the index remembers.
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;

    /// Drop the named bucket maps in one logical batch, then clear the
    /// bucket index. A `put` racing this call may re-register its bucket;
    /// only that bucket's flush effect is lost.
    async fn delete_buckets(&self, buckets: &[String]) -> Result<(), StoreError>;
}

pub type AbstractCacheStore = Arc<dyn CacheStore + Send + Sync>;
