//! Session cache stores
//!
//! Verified sessions are cached under `"<provider>:<cookie>"` so repeated
//! checks of the same cookie do not hit the third party application. Every
//! entry shares one process-wide TTL.
//!
//! Two backends are available:
//! - [`MemoryStore`] - bounded in-process cache (default)
//! - [`RedisStore`] - shared Redis cache, selected when `cache.redis.host` is set
//!
//! Both are wrapped in a [`MetricStore`] that counts hits and misses for `/metrics`.

mod memory;
mod metrics;
mod redis_store;

pub use memory::MemoryStore;
pub use metrics::{CacheMetrics, MetricStore, MetricsSnapshot};
pub use redis_store::RedisStore;

use crate::settings::CacheSettings;
use async_trait::async_trait;
use std::time::Duration;

/// Errors raised by a cache backend
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    /// The stored bytes are not a text value
    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Key/value store with TTL-bounded entries
///
/// Each operation is individually atomic. No guarantee is made across a
/// `get` followed by a `set`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value; `Ok(None)` on miss or expiry
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value, replacing any existing entry
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove a value; deleting an absent key is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Backend name used as the `store` metrics label
    fn backend(&self) -> &'static str;
}

/// Cache key for a provider cookie; the cookie value is used verbatim
#[must_use]
pub fn session_key(provider: &str, cookie: &str) -> String {
    format!("{provider}:{cookie}")
}

/// Build the configured backend wrapped with metrics
///
/// # Errors
///
/// Returns an error if the Redis backend is selected and cannot be reached
pub async fn build_store(settings: &CacheSettings) -> Result<MetricStore, CacheError> {
    if settings.redis.is_enabled() {
        log::info!(
            "Using redis session cache at {}:{} (db {})",
            settings.redis.host,
            settings.redis.port,
            settings.redis.db
        );
        let store = RedisStore::connect(&settings.redis).await?;
        Ok(MetricStore::new(Box::new(store)))
    } else {
        log::info!(
            "Using in-process session cache (max {} entries)",
            settings.memory.max_capacity
        );
        Ok(MetricStore::new(Box::new(MemoryStore::new(
            settings.memory.max_capacity,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_is_namespaced_and_verbatim() {
        assert_eq!(session_key("ghost", "abc"), "ghost:abc");
        assert_eq!(session_key("n8n", " AbC= "), "n8n: AbC= ");
        assert_ne!(session_key("ghost", "abc"), session_key("n8n", "abc"));
    }

    #[tokio::test]
    async fn test_build_store_defaults_to_memory() {
        let store = build_store(&CacheSettings::default()).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }
}
