use async_trait::async_trait;
use rustis::client::{BatchPreparedCommand, Client, Pipeline};
use rustis::commands::{GenericCommands, HashCommands, SetCommands};
use tracing::{debug, warn};

use crate::{CacheStore, CachedResponse, StoreError};

/// Redis-backed cache store.
///
/// Layout inside Redis: one hash per bucket named `<prefix>:<bucket>`
/// mapping key to encoded entry bytes, plus one set `<prefix>:buckets`
/// holding the full name of every bucket hash ever written. The prefix
/// keeps the cache from colliding with unrelated data in a shared instance.
pub struct RedisCacheStore {
    pub client: Client,
    prefix: String,
}

impl RedisCacheStore {
    pub fn new(client: Client, prefix: &str) -> Self {
        Self {
            client,
            prefix: prefix.to_string(),
        }
    }

    /// Full name of the hash holding a bucket's entries.
    pub fn bucket_key(&self, bucket: &str) -> String {
        format!("{}:{}", self.prefix, bucket)
    }

    /// Full name of the bucket index set.
    pub fn index_key(&self) -> String {
        format!("{}:buckets", self.prefix)
    }

    async fn execute_pipeline(
        &self,
        pipeline: Pipeline<'_>,
    ) -> Result<(), StoreError> {
        pipeline
            .execute()
            .await
            .map(|_: ()| ())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<CachedResponse>, StoreError> {
        let raw: Option<String> =
            self.client.hget(self.bucket_key(bucket), key).await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match CachedResponse::from_bytes(raw.as_bytes()) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                warn!(bucket, key, %err, "dropping corrupt cache entry");
                if let Err(err) =
                    self.client.hdel(self.bucket_key(bucket), key).await
                {
                    warn!(bucket, key, %err, "failed to drop corrupt entry");
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
        let payload = String::from_utf8(entry.to_bytes()?)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let bucket_key = self.bucket_key(bucket);

        // SADD before HSET so the index never misses a bucket with live
        // entries, even if the pipeline is cut short.
        let mut pipeline = self.client.create_pipeline();
        pipeline.sadd(self.index_key(), &bucket_key).forget();
        pipeline.hset(&bucket_key, [(key, &payload)]).forget();
        self.execute_pipeline(pipeline).await?;

        debug!(bucket, key, "cached entry");
        Ok(())
    }

    async fn delete_key(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client.hdel(self.bucket_key(bucket), key).await?;
        debug!(bucket, key, "invalidated entry");
        Ok(())
    }

    async fn register_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.client
            .sadd(self.index_key(), self.bucket_key(bucket))
            .await?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let buckets: Vec<String> = self.client.smembers(self.index_key()).await?;
        Ok(buckets)
    }

    async fn delete_buckets(&self, buckets: &[String]) -> Result<(), StoreError> {
        let mut pipeline = self.client.create_pipeline();
        if !buckets.is_empty() {
            pipeline.del(buckets.to_vec()).forget();
        }
        pipeline.del(self.index_key()).forget();
        self.execute_pipeline(pipeline).await
    }
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}
