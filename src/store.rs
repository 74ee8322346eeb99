//! Time-boxed key-value storage.
//!
//! [`ExpiringStore`] is the one abstraction behind both the response cache
//! and the rate limiter. Each user holds its own namespaced view, so clearing
//! the cache never touches rate-limit windows even when both share a backend.
//!
//! [`MemoryStore`] is the in-process implementation, a moka cache with
//! per-entry expiry. Bounded stores evict under size pressure; rate state
//! belongs in an [`unbounded`](MemoryStore::unbounded) one. Hosts with a
//! shared persistence layer (a database table, redis, ...) implement the
//! trait themselves.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use crate::{Result, ScrivenerError};

/// Default maximum number of entries held by a [`MemoryStore`] backend.
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Key-value store whose entries expire after a per-entry time-to-live.
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    /// Value stored under `key`, if present and not yet expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous entry and its expiry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Remove the entry under `key`, if any.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry in this store's namespace.
    async fn clear(&self) -> Result<()>;
}

#[derive(Clone)]
struct StoredValue {
    value: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process [`ExpiringStore`] backed by a bounded moka cache.
///
/// Cloning a `MemoryStore` shares the backend; [`MemoryStore::namespace`]
/// derives views that prefix their keys.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Cache<String, StoredValue>>,
    prefix: String,
}

impl MemoryStore {
    /// Create an empty store with the default capacity (10,000 entries).
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create an empty store with a custom capacity.
    pub fn with_max_entries(max: u64) -> Self {
        Self::build(Some(max))
    }

    /// Create an empty store without size-based eviction.
    ///
    /// Entries leave only when their TTL runs out or they are deleted. Use it
    /// for state that must not be dropped early, such as rate-limit windows.
    pub fn unbounded() -> Self {
        Self::build(None)
    }

    fn build(max: Option<u64>) -> Self {
        let mut builder = Cache::builder()
            .expire_after(PerEntryTtl)
            .support_invalidation_closures();
        if let Some(max) = max {
            builder = builder.max_capacity(max);
        }
        Self {
            entries: Arc::new(builder.build()),
            prefix: String::new(),
        }
    }

    /// A view of the same backend whose keys live under `name:`.
    pub fn namespace(&self, name: &str) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            prefix: format!("{}{name}:", self.prefix),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExpiringStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .get(&self.full_key(key))
            .await
            .map(|stored| stored.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries
            .insert(self.full_key(key), StoredValue { value, ttl })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.invalidate(&self.full_key(key)).await;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.prefix.is_empty() {
            self.entries.invalidate_all();
            return Ok(());
        }
        let prefix = self.prefix.clone();
        self.entries
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
            .map(|_| ())
            .map_err(|e| ScrivenerError::Storage(format!("failed to clear {}: {e}", self.prefix)))
    }
}
