//! Cache Entry Module
//!
//! The single-key envelope every value is wrapped in before it is encoded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::Value;
use crate::error::{CacheError, Result};

// == Cache Entry ==
/// Maps one cache key to one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry(BTreeMap<String, Value>);

impl Entry {
    // == Constructor ==
    /// Wraps `value` under `key`.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.into(), value);
        Self(map)
    }

    // == Unwrap ==
    /// Consumes the envelope and returns the value written under `key`.
    ///
    /// An envelope holding anything other than exactly that one key was not
    /// written by this cache for this key and is reported as a decode error.
    pub fn into_value(mut self, key: &str) -> Result<Value> {
        if self.0.len() != 1 {
            return Err(CacheError::Decode(format!(
                "entry for '{}' holds {} keys",
                key,
                self.0.len()
            )));
        }
        self.0
            .remove(key)
            .ok_or_else(|| CacheError::Decode(format!("entry does not contain key '{}'", key)))
    }
}
