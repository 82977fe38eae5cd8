//! Cache capability for cross-request replay coordination
//!
//! The pipeline never touches a concrete cache backend directly. Everything
//! goes through the [`Cache`] trait so deployments can plug in a shared
//! backend (e.g. Redis) while tests and single-process setups use
//! [`MemoryCache`]. Expiry is the backend's policy; this interface carries no
//! TTL semantics.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Infrastructure failure talking to the cache backend
///
/// Kept distinct from the pipeline's rejection taxonomy so operators can tell
/// "bad transaction" from "cache outage".
#[derive(Debug, Clone, Error)]
#[error("cache error: {0}")]
pub struct CacheError(pub String);

/// Key/value store used for dedup and cooldown coordination
///
/// `set_if_absent` must be atomic: of any number of concurrent callers for
/// the same absent key, exactly one observes `true`. The dedup check depends
/// on this; a backend that can only offer get-then-set reintroduces a race
/// window between concurrent signing requests.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Atomic test-and-set. Returns `true` iff `key` was absent and now
    /// holds `value`; `false` leaves the existing value untouched.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, CacheError>;
}

/// In-process cache backend over a concurrent map
///
/// Entries live for the process lifetime; suitable for tests and
/// single-instance deployments.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, for test assertions and diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool, CacheError> {
        // DashMap's entry API holds the shard lock across the vacancy check
        // and the insert, which is what makes this a true test-and-set.
        match self.entries.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(value.to_string());
                Ok(true)
            }
        }
    }
}
