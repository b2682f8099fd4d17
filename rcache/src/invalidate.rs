//! Single-key and global cache invalidation.

use rcache_store::{AbstractCacheStore, StoreError};
use tracing::info;

pub struct Invalidator {
    store: AbstractCacheStore,
}

impl Invalidator {
    pub fn new(store: AbstractCacheStore) -> Self {
        Self { store }
    }

    pub async fn invalidate_key(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(), StoreError> {
        self.store.delete_key(bucket, key).await
    }

    /// Flush every bucket the index remembers, then clear the index.
    ///
    /// Not transactional. The maps are deleted before the index is cleared,
    /// so a `put` racing the flush can at worst re-register its bucket and
    /// keep its entry; only that bucket's flush effect is lost.
    pub async fn invalidate_all(&self) -> Result<(), StoreError> {
        let buckets = self.store.list_buckets().await?;
        self.store.delete_buckets(&buckets).await?;
        info!(count = buckets.len(), "cache flushed");
        Ok(())
    }
}
