//! In-memory implementation of the CacheStore trait, mirroring the Redis
//! key layout. Used in tests and for running the proxy without a backend.
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::warn;

use crate::{CacheStore, CachedResponse, StoreError};

pub struct MemoryCacheStore {
    /// Namespaced bucket name to key/encoded-entry map.
    pub buckets: Mutex<HashMap<String, HashMap<String, Vec<u8>>>>,
    /// Bucket index, holding namespaced bucket names.
    pub index: Mutex<HashSet<String>>,
    prefix: String,
}

impl MemoryCacheStore {
    pub fn new(prefix: &str) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            index: Mutex::new(HashSet::new()),
            prefix: prefix.to_string(),
        }
    }

    pub fn bucket_key(&self, bucket: &str) -> String {
        format!("{}:{}", self.prefix, bucket)
    }

    pub fn index_key(&self) -> String {
        format!("{}:buckets", self.prefix)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<CachedResponse>, StoreError> {
        let bucket_key = self.bucket_key(bucket);
        let raw = {
            let buckets = self
                .buckets
                .lock()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            buckets
                .get(&bucket_key)
                .and_then(|entries| entries.get(key))
                .cloned()
        };

        let Some(raw) = raw else {
            return Ok(None);
        };

        match CachedResponse::from_bytes(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                warn!(bucket, key, %err, "dropping corrupt cache entry");
                let mut buckets = self
                    .buckets
                    .lock()
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                if let Some(entries) = buckets.get_mut(&bucket_key) {
                    entries.remove(key);
                }
                Ok(None)
            }
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        entry: &CachedResponse,
    ) -> Result<(), StoreError> {
        let payload = entry.to_bytes()?;
        let bucket_key = self.bucket_key(bucket);

        // One lock at a time: holding `index` while waiting on `buckets`
        // would deadlock against `delete_buckets`.
        {
            let mut index = self
                .index
                .lock()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            index.insert(bucket_key.clone());
        }

        let mut buckets = self
            .buckets
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        buckets.entry(bucket_key).or_default().insert(key.to_string(), payload);
        Ok(())
    }

    async fn delete_key(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        if let Some(entries) = buckets.get_mut(&self.bucket_key(bucket)) {
            entries.remove(key);
        }
        Ok(())
    }

    async fn register_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut index = self
            .index
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        index.insert(self.bucket_key(bucket));
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let index = self
            .index
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(index.iter().cloned().collect())
    }

    async fn delete_buckets(&self, to_delete: &[String]) -> Result<(), StoreError> {
        // Maps go first, index second, and never both locks at once.
        {
            let mut buckets = self
                .buckets
                .lock()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            for name in to_delete {
                buckets.remove(name);
            }
        }

        let mut index = self
            .index
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        index.clear();
        Ok(())
    }
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets = self.buckets.lock().unwrap();
        let index = self.index.lock().unwrap();

        f.debug_struct("MemoryCacheStore")
            .field("buckets", &buckets.len())
            .field("index", &*index)
            .finish()
    }
}
