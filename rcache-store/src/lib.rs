//! Cache data model and storage backends for the rcache proxy.
//!
//! This crate provides the pieces of the caching layer that do not touch
//! HTTP transport: deriving cache keys from wire paths, the serialized form
//! of a captured origin response, the `CacheStore` capability trait, and
//! its Redis and in-memory implementations.

pub mod backend;
pub mod entry;
pub mod keys;
pub mod store;

pub use crate::backend::{MemoryCacheStore, RedisCacheStore};
pub use crate::entry::CachedResponse;
pub use crate::keys::CacheKey;
pub use crate::store::{AbstractCacheStore, CacheStore};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),
    #[error("Redis error: {0}")]
    Redis(#[from] rustis::Error),
}
