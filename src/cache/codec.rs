//! Codec Module
//!
//! Binary encoding of cache entries using bincode.

use bincode::Options;

use crate::cache::Entry;
use crate::error::{CacheError, Result};

fn options() -> impl Options {
    bincode::DefaultOptions::new().reject_trailing_bytes()
}

/// Serializes an entry into the bytes stored in a backend's value slot.
pub fn encode(entry: &Entry) -> Result<Vec<u8>> {
    options()
        .serialize(entry)
        .map_err(|e| CacheError::Encode(e.to_string()))
}

/// Inverse of [`encode`]. Truncated, padded or foreign input fails with
/// [`CacheError::Decode`].
pub fn decode(bytes: &[u8]) -> Result<Entry> {
    options()
        .deserialize(bytes)
        .map_err(|e| CacheError::Decode(e.to_string()))
}
