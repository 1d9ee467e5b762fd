//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type shared by every cache backend.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored bytes could not be decoded back into an entry
    #[error("Decode error: {0}")]
    Decode(String),

    /// Value could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// Connection, pool checkout or engine transaction failure
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A bulk delete stopped part-way; `deleted` keys were already removed
    #[error("Bulk delete failed after removing {deleted} keys: {reason}")]
    PartialBulkDeleteFailure { deleted: usize, reason: String },

    /// Construction-time configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// True for the error kind `Has` reports as a plain miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

// == Backend Conversions ==
impl From<rocksdb::Error> for CacheError {
    fn from(err: rocksdb::Error) -> Self {
        CacheError::BackendUnavailable(format!("rocksdb: {}", err))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::BackendUnavailable(format!("redis: {}", err))
    }
}

impl From<r2d2::Error> for CacheError {
    fn from(err: r2d2::Error) -> Self {
        CacheError::BackendUnavailable(format!("connection pool: {}", err))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
