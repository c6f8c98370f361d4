// crates/server/src/cache.rs
//! Ephemeral session mirror for cheap "what is the candidate seeing" reads.
//!
//! The database stays authoritative. Every cache call is fallible and callers
//! log-and-continue on failure, so swapping the in-process map for an
//! external store does not change any call site.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
#[error("cache unavailable: {0}")]
pub struct CacheError(String);

impl<T> From<PoisonError<T>> for CacheError {
    fn from(_: PoisonError<T>) -> Self {
        CacheError("poisoned".to_string())
    }
}

/// In-process KV mirror. Keys follow the `session:<uid>` convention.
pub struct SessionCache {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(session_uid: &str) -> String {
        format!("session:{session_uid}")
    }

    pub fn put(&self, session_uid: &str, value: serde_json::Value) -> Result<(), CacheError> {
        let mut entries = self.entries.lock()?;
        entries.insert(Self::key(session_uid), value);
        Ok(())
    }

    pub fn get(&self, session_uid: &str) -> Result<Option<serde_json::Value>, CacheError> {
        let entries = self.entries.lock()?;
        Ok(entries.get(&Self::key(session_uid)).cloned())
    }

    pub fn evict(&self, session_uid: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock()?;
        entries.remove(&Self::key(session_uid));
        Ok(())
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
