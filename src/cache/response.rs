//! Prompt-keyed response cache.
//!
//! [`ResponseCache`] maps a SHA-256 fingerprint of the prompt text to the
//! generated text. The key depends on the prompt alone: two subjects (or two
//! users) producing byte-identical prompts share one entry. Entries live for
//! the TTL passed at insertion; a TTL of zero disables writes.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::Result;
use crate::store::ExpiringStore;
use crate::telemetry;

/// Cache layer over an [`ExpiringStore`] namespace.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn ExpiringStore>,
}

impl ResponseCache {
    /// Wrap a store. The store should be dedicated to the cache (e.g. a
    /// `MemoryStore::namespace("cache")` view) since [`clear_all`](Self::clear_all)
    /// empties it entirely.
    pub fn new(store: Arc<dyn ExpiringStore>) -> Self {
        Self { store }
    }

    /// Cached text for `prompt`, if present and unexpired.
    ///
    /// Emits cache hit/miss metrics.
    pub async fn lookup(&self, prompt: &str) -> Result<Option<String>> {
        let hit = self.store.get(&fingerprint(prompt)).await?;
        if hit.is_some() {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        }
        Ok(hit)
    }

    /// Cache `response` for `prompt` for `ttl_secs` seconds. No-op when `ttl_secs` is 0.
    pub async fn store(&self, prompt: &str, response: &str, ttl_secs: u64) -> Result<()> {
        if ttl_secs == 0 {
            return Ok(());
        }
        self.store
            .set(
                &fingerprint(prompt),
                response.to_string(),
                Duration::from_secs(ttl_secs),
            )
            .await
    }

    /// Drop every cached response.
    pub async fn clear_all(&self) -> Result<()> {
        self.store.clear().await
    }
}

/// Stable hex SHA-256 of the prompt text.
pub fn fingerprint(prompt: &str) -> String {
    Sha256::digest(prompt.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_deterministic() {
        assert_eq!(fingerprint("hello"), fingerprint("hello"));
        assert_eq!(fingerprint("hello").len(), 64);
    }

    #[test]
    fn fingerprint_differs_on_input() {
        assert_ne!(fingerprint("hello"), fingerprint("hello "));
    }

    #[test]
    fn fingerprint_known_value() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
