//! # rcache - caching reverse proxy for a Riak-style key/value origin
//!
//! `rcache` sits between HTTP clients and a Riak-style key/value service
//! and answers reads from a Redis-backed cache when it can. Origin
//! responses to cacheable reads are captured and replayed byte-faithfully
//! on later hits; mutations flow through to the origin and invalidate the
//! matching cache entry once the origin has confirmed them.
//!
//! The cache is strictly an accelerator: any cache-side failure degrades
//! the request to a plain origin round-trip, never to an error the client
//! can see.
//!
//! ## Modules
//!
//! - `config`: YAML configuration for listen address, origin, and Redis.
//! - `origin`: outbound leg, forwards requests and buffers responses.
//! - `intercept`: response-observation hooks (populate / invalidate).
//! - `invalidate`: single-key and global cache invalidation.
//! - `server`: request classification and the hyper serve loop.
pub mod config;
pub mod intercept;
pub mod invalidate;
pub mod origin;
pub mod server;

pub use crate::config::{ConfigError, ProxyConfig};
pub use crate::intercept::{CachePopulate, Interceptor, Invalidate, PassThrough};
pub use crate::invalidate::Invalidator;
pub use crate::origin::{OriginClient, OriginError};
pub use crate::server::App;
