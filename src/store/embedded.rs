//! Embedded Store Module
//!
//! Cache backend over a local RocksDB database.
//!
//! Each engine value is an 8-byte big-endian expiry deadline (unix
//! milliseconds, 0 = never) followed by the encoded entry. Reads treat a
//! passed deadline as absent; a compaction filter registered at open time
//! drops expired values from disk.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rocksdb::{CompactionDecision, Options, ReadOptions, WriteBatch, DB};
use tracing::{debug, error, info};

use crate::cache::{codec, Cache, Entry, Value, BULK_DELETE_BATCH_SIZE};
use crate::error::{CacheError, Result};

const DEADLINE_LEN: usize = 8;
const NO_DEADLINE: u64 = 0;

// == Embedded Cache ==
/// Cache stored in a RocksDB database on local disk.
///
/// The embedded store has no namespace: keys are stored verbatim and
/// `empty()` clears the whole database.
pub struct EmbeddedCache {
    db: DB,
    path: PathBuf,
    batch_size: usize,
}

impl EmbeddedCache {
    // == Constructor ==
    /// Opens (or creates) the database directory at `path`.
    ///
    /// # Errors
    /// - `BackendUnavailable` if the directory cannot be created or the
    ///   database is locked by another process
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&path).map_err(|e| {
            CacheError::BackendUnavailable(format!("cannot create {}: {}", path.display(), e))
        })?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compaction_filter("cachette-expiry", reap_expired);

        let db = DB::open(&opts, &path).map_err(|e| {
            error!("Failed to open RocksDB at '{}': {}", path.display(), e);
            CacheError::from(e)
        })?;

        info!("Opened embedded cache at '{}'", path.display());
        Ok(Self {
            db,
            path,
            batch_size: BULK_DELETE_BATCH_SIZE,
        })
    }

    /// Overrides how many keys a bulk delete commits per write batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Deletes `keys` in a single write batch.
    fn delete_keys(&self, keys: &[Vec<u8>]) -> Result<usize> {
        let mut batch = WriteBatch::default();
        for key in keys {
            batch.delete(key);
        }
        self.db.write(batch)?;
        debug!("Committed delete batch of {} keys", keys.len());
        Ok(keys.len())
    }
}

impl Cache for EmbeddedCache {
    fn backend_name(&self) -> &'static str {
        "embedded"
    }

    fn get(&self, key: &str) -> Result<Value> {
        // `DB::get` copies the value out of the engine's buffers.
        let raw = self
            .db
            .get(key.as_bytes())?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        let (deadline, payload) = split_deadline(&raw)?;
        if is_expired(deadline, now_ms()) {
            debug!("Get '{}' found expired value", key);
            return Err(CacheError::NotFound(key.to_string()));
        }
        debug!("Get '{}' ({} bytes)", key, payload.len());

        codec::decode(payload)?.into_value(key)
    }

    fn set(&self, key: &str, value: Value, ttl_secs: Option<u64>) -> Result<()> {
        if ttl_secs == Some(0) {
            return self.forget(key);
        }

        let payload = codec::encode(&Entry::new(key, value))?;
        let deadline = ttl_secs.map_or(NO_DEADLINE, |ttl| {
            now_ms().saturating_add(ttl.saturating_mul(1000))
        });

        self.db
            .put(key.as_bytes(), with_deadline(deadline, &payload))?;
        debug!("Set '{}' (ttl={:?})", key, ttl_secs);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        self.db.delete(key.as_bytes())?;
        debug!("Forget '{}'", key);
        Ok(())
    }

    // == Bulk Delete ==
    /// Scans forward from `pattern` collecting keys only and commits a
    /// delete batch every `batch_size` keys. One iterator serves the
    /// whole scan.
    fn empty_by_match(&self, pattern: &str) -> Result<()> {
        let prefix = pattern.as_bytes();
        let partial = move |deleted: usize| {
            move |err: CacheError| {
                error!("Bulk delete of '{}' failed after {} keys: {}", pattern, deleted, err);
                CacheError::PartialBulkDeleteFailure {
                    deleted,
                    reason: err.to_string(),
                }
            }
        };

        let mut read_opts = ReadOptions::default();
        read_opts.fill_cache(false);
        let mut iter = self.db.raw_iterator_opt(read_opts);
        iter.seek(prefix);

        let mut pending: Vec<Vec<u8>> = Vec::with_capacity(self.batch_size.min(1024));
        let mut deleted = 0;

        while iter.valid() {
            match iter.key() {
                Some(key) if key.starts_with(prefix) => pending.push(key.to_vec()),
                _ => break,
            }
            if pending.len() >= self.batch_size {
                deleted += self.delete_keys(&pending).map_err(partial(deleted))?;
                pending.clear();
            }
            iter.next();
        }
        iter.status()
            .map_err(CacheError::from)
            .map_err(partial(deleted))?;

        if !pending.is_empty() {
            deleted += self.delete_keys(&pending).map_err(partial(deleted))?;
        }

        info!("Removed {} keys matching '{}' from embedded cache", deleted, pattern);
        Ok(())
    }

    /// Runs a full-range compaction so the expiry filter reclaims space.
    fn run_maintenance(&self) -> Result<()> {
        self.db.compact_range(None::<&[u8]>, None::<&[u8]>);
        info!("Compacted embedded cache at '{}'", self.path.display());
        Ok(())
    }
}

// == Expiry Framing ==
fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

fn is_expired(deadline: u64, now: u64) -> bool {
    deadline != NO_DEADLINE && now >= deadline
}

fn with_deadline(deadline: u64, payload: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(DEADLINE_LEN + payload.len());
    raw.extend_from_slice(&deadline.to_be_bytes());
    raw.extend_from_slice(payload);
    raw
}

fn split_deadline(raw: &[u8]) -> Result<(u64, &[u8])> {
    if raw.len() < DEADLINE_LEN {
        return Err(CacheError::Decode(format!(
            "stored value is {} bytes, shorter than the expiry header",
            raw.len()
        )));
    }
    let (head, payload) = raw.split_at(DEADLINE_LEN);
    let mut deadline = [0u8; DEADLINE_LEN];
    deadline.copy_from_slice(head);
    Ok((u64::from_be_bytes(deadline), payload))
}

/// Compaction filter: drops values whose deadline has passed.
fn reap_expired(_level: u32, _key: &[u8], value: &[u8]) -> CompactionDecision {
    match split_deadline(value) {
        Ok((deadline, _)) if is_expired(deadline, now_ms()) => CompactionDecision::Remove,
        _ => CompactionDecision::Keep,
    }
}
