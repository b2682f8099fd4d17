//! Serialized form of a captured origin response.

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// A captured HTTP response: status, headers, raw body bytes.
///
/// Headers are kept as a list of name/value pairs so repeated names
/// round-trip with their multiplicity; order is not guaranteed. Values are
/// raw bytes, since header values are not required to be UTF-8. Entries
/// are immutable once stored, a write with the same key replaces the old
/// entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// Encode into the self-describing byte form stored in the backend.
    ///
    /// The encoding is explicit about where headers end and the body begins,
    /// so bodies containing blank-line-like byte sequences round-trip intact.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode stored bytes. Anything not produced by [`Self::to_bytes`],
    /// truncated input included, is reported as a corrupt entry.
    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        let entry: Self = serde_json::from_slice(data)
            .map_err(|e| StoreError::CorruptEntry(e.to_string()))?;
        if !(100..=599).contains(&entry.status) {
            return Err(StoreError::CorruptEntry(format!(
                "status code {} out of range",
                entry.status
            )));
        }
        Ok(entry)
    }
}
