//! Cache Module
//!
//! The backend-independent cache contract, the value model and the codec
//! that turns values into the bytes a backend stores.

pub mod codec;
mod entry;
mod value;


use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{CacheError, Result};

// Re-export public types
pub use entry::Entry;
pub use value::Value;

// == Public Constants ==
/// Number of keys collected before a bulk delete commits a batch.
pub const BULK_DELETE_BATCH_SIZE: usize = 100_000;

// == Cache Trait ==
/// Key-value cache operations shared by every backend.
///
/// Every call is synchronous. Implementations are shared between threads
/// behind an `Arc<dyn Cache>`.
pub trait Cache: Send + Sync {
    /// Short backend name used in logs.
    fn backend_name(&self) -> &'static str;

    /// Returns the live value stored under `key`.
    ///
    /// # Errors
    /// - `NotFound` when the key is absent or expired
    /// - `Decode` when the stored bytes are not a valid entry for `key`
    fn get(&self, key: &str) -> Result<Value>;

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// With `ttl_secs` the backend expires the entry natively after that many
    /// seconds. A TTL of zero removes the key immediately.
    fn set(&self, key: &str, value: Value, ttl_secs: Option<u64>) -> Result<()>;

    /// Removes `key`. Succeeds when the key is already absent.
    fn forget(&self, key: &str) -> Result<()>;

    /// Removes every key starting with `pattern`.
    ///
    /// Not atomic: keys are deleted in batches and a failure leaves earlier
    /// batches deleted (`PartialBulkDeleteFailure`). Keys written while the
    /// sweep runs may survive.
    fn empty_by_match(&self, pattern: &str) -> Result<()>;

    /// Removes every key this cache owns.
    fn empty(&self) -> Result<()> {
        self.empty_by_match("")
    }

    /// Reports whether a live, decodable entry exists for `key`.
    ///
    /// Implemented as a read so expiry and decoding behave exactly as in
    /// [`Cache::get`]. Any failure reads as `false`; failures other than
    /// `NotFound` are logged.
    fn has(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(CacheError::NotFound(_)) => Ok(false),
            Err(err) => {
                warn!(
                    backend = self.backend_name(),
                    key, error = %err,
                    "cache read failed during has(); reporting miss"
                );
                Ok(false)
            }
        }
    }

    /// Periodic housekeeping such as compaction. No-op by default.
    fn run_maintenance(&self) -> Result<()> {
        Ok(())
    }
}

// == Typed Helpers ==
/// Stores and loads any serde type through the JSON-compatible subset of [`Value`].
pub trait CacheExt: Cache {
    fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: Option<u64>) -> Result<()> {
        let json = serde_json::to_value(value).map_err(|e| CacheError::Encode(e.to_string()))?;
        self.set(key, Value::from(json), ttl_secs)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let json = serde_json::Value::try_from(self.get(key)?)?;
        serde_json::from_value(json).map_err(|e| CacheError::Decode(e.to_string()))
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}
