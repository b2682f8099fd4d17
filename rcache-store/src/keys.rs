//! Cache key derivation from request paths.

/// Route marker the origin uses for key/value operations.
const ROUTE_MARKER: &str = "riak";

/// Identity of a cached entry, taken verbatim from the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub bucket: String,
    pub key: String,
}

impl CacheKey {
    /// Derive a cache key from a wire path of the form
    /// `/riak/{bucket}/{key}[/...]`.
    ///
    /// Any other shape is not cacheable and yields `None`. Empty bucket or
    /// key segments are rejected so a malformed path can never collide with
    /// a legitimate entry. Pure and total, never fails.
    pub fn from_path(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 4 || segments[1] != ROUTE_MARKER {
            return None;
        }
        let (bucket, key) = (segments[2], segments[3]);
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}
