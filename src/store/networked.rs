//! Networked Store Module
//!
//! Cache backend over a remote Redis server reached through an r2d2
//! connection pool. Every key is stored as `<prefix>:<key>`.

use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use tracing::{debug, error, info};

use crate::cache::{codec, Cache, Entry, Value};
use crate::config::NetworkedConfig;
use crate::error::{CacheError, Result};

/// Keys requested per SCAN round trip.
const SCAN_PAGE_SIZE: usize = 1000;

// == Networked Cache ==
/// Cache stored in Redis under a caller-chosen namespace.
pub struct NetworkedCache {
    pool: Pool<redis::Client>,
    prefix: String,
}

impl NetworkedCache {
    // == Constructor ==
    /// Builds the connection pool described by `config`.
    ///
    /// With `min_idle` at 0 connections are dialed lazily, so an unreachable
    /// server surfaces on the first operation rather than here. A nonzero
    /// `min_idle` blocks until that many connections are open.
    ///
    /// # Errors
    /// - `InvalidConfig` for a malformed address or a zero `max_active`
    /// - `BackendUnavailable` if the pool cannot be built or warmed up
    pub fn connect(config: &NetworkedConfig) -> Result<Self> {
        if config.max_active == 0 {
            return Err(CacheError::InvalidConfig(
                "max_active must be at least 1".to_string(),
            ));
        }
        let client = redis::Client::open(config.connection_info()?)
            .map_err(|e| CacheError::InvalidConfig(format!("redis connection: {}", e)))?;

        // r2d2 panics on a zero idle timeout; zero means idle connections stay open.
        let idle_timeout = match config.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let pool = Pool::builder()
            .max_size(config.max_active)
            .min_idle(Some(config.min_idle.min(config.max_active)))
            .idle_timeout(idle_timeout)
            .connection_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
            .test_on_check_out(true)
            .build(client)?;

        info!(
            "Connected networked cache with prefix '{}' (max {} connections)",
            config.prefix, config.max_active
        );
        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the stored name for a caller key.
    pub fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    /// Borrows a connection; it returns to the pool when dropped.
    fn conn(&self) -> Result<PooledConnection<redis::Client>> {
        Ok(self.pool.get()?)
    }

    /// Drives the SCAN cursor for `glob`, counting removed keys into `deleted`.
    fn scan_and_delete(&self, glob: &str, deleted: &mut usize) -> Result<()> {
        let mut conn = self.conn()?;
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(glob)
                .arg("COUNT")
                .arg(SCAN_PAGE_SIZE)
                .query(&mut *conn)?;

            *deleted += Self::delete_page(&mut conn, &keys)?;

            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }

    /// Deletes one SCAN page of keys in a single pipeline.
    fn delete_page(conn: &mut redis::Connection, keys: &[Vec<u8>]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("DEL").arg(key).ignore();
        }
        pipe.query::<()>(conn)?;
        debug!("Deleted page of {} keys", keys.len());
        Ok(keys.len())
    }
}

impl Cache for NetworkedCache {
    fn backend_name(&self) -> &'static str {
        "networked"
    }

    fn get(&self, key: &str) -> Result<Value> {
        let full_key = self.namespaced(key);
        let mut conn = self.conn()?;

        let raw: Option<Vec<u8>> = redis::cmd("GET").arg(&full_key).query(&mut *conn)?;
        let raw = raw.ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        debug!("Get '{}' ({} bytes)", full_key, raw.len());

        codec::decode(&raw)?.into_value(&full_key)
    }

    fn set(&self, key: &str, value: Value, ttl_secs: Option<u64>) -> Result<()> {
        if ttl_secs == Some(0) {
            return self.forget(key);
        }

        let full_key = self.namespaced(key);
        let payload = codec::encode(&Entry::new(full_key.as_str(), value))?;
        let mut conn = self.conn()?;

        match ttl_secs {
            Some(ttl) => redis::cmd("SETEX")
                .arg(&full_key)
                .arg(ttl)
                .arg(payload)
                .query::<()>(&mut *conn)?,
            None => redis::cmd("SET")
                .arg(&full_key)
                .arg(payload)
                .query::<()>(&mut *conn)?,
        }
        debug!("Set '{}' (ttl={:?})", full_key, ttl_secs);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<()> {
        let full_key = self.namespaced(key);
        let mut conn = self.conn()?;
        redis::cmd("DEL").arg(&full_key).query::<()>(&mut *conn)?;
        debug!("Forget '{}'", full_key);
        Ok(())
    }

    // == Bulk Delete ==
    /// Walks `SCAN` pages for `<prefix>:<pattern>*`, deleting each page
    /// before requesting the next, until the cursor returns to zero.
    fn empty_by_match(&self, pattern: &str) -> Result<()> {
        let glob = format!("{}*", escape_glob(&self.namespaced(pattern)));
        let mut deleted = 0;
        let outcome = self.scan_and_delete(&glob, &mut deleted);

        match outcome {
            Ok(()) => {
                info!("Removed {} keys matching '{}' from networked cache", deleted, glob);
                Ok(())
            }
            Err(err) => {
                error!("Bulk delete of '{}' failed after {} keys: {}", glob, deleted, err);
                Err(CacheError::PartialBulkDeleteFailure {
                    deleted,
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// Escapes Redis glob metacharacters so `pattern` matches literally.
fn escape_glob(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
