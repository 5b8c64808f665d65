//! Read-through session cache
//!
//! A cookie is checked against the cache first and against the provider only
//! on a miss. Only successful verifications are written back, so a rejected
//! cookie is re-checked upstream on every request.

use crate::cache::{session_key, CacheError, CacheStore};
use crate::models::Session;
use crate::providers::{ProviderRequest, SessionProvider};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of resolving a cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Authenticated(Session),
    Unauthenticated,
}

#[derive(Clone)]
pub struct SessionResolver {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl SessionResolver {
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve the provider cookie carried by `request`
    ///
    /// Cache failures never fail the request: a broken read is a miss and a
    /// broken write only costs the next request an upstream call.
    pub async fn resolve(
        &self,
        provider: &dyn SessionProvider,
        request: &ProviderRequest,
    ) -> Resolution {
        let Some(cookie) = request.cookie() else {
            log::debug!("No {} cookie on request", provider.cookie_name());
            return Resolution::Unauthenticated;
        };
        let key = session_key(provider.name(), cookie);

        if let Some(session) = self.cached(&key).await {
            log::debug!("Session cache hit for {}", provider.name());
            return Resolution::Authenticated(session);
        }
        log::debug!("Session cache miss for {}", provider.name());

        let Some(session) = provider.verify_existing(request).await else {
            return Resolution::Unauthenticated;
        };
        if !session.is_valid() {
            log::debug!("{} verified a session without a subject", provider.name());
            return Resolution::Unauthenticated;
        }

        self.store(&key, &session).await;
        Resolution::Authenticated(session)
    }

    /// Cached session for `key`, healing entries that no longer decode
    async fn cached(&self, key: &str) -> Option<Session> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(CacheError::Corrupt(reason)) => {
                self.evict(key, &reason).await;
                return None;
            }
            Err(e) => {
                log::debug!("Session cache read failed, treating as miss: {e}");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.is_valid() => Some(session),
            Ok(_) => {
                self.evict(key, "cached session has no subject").await;
                None
            }
            Err(e) => {
                self.evict(key, &e.to_string()).await;
                None
            }
        }
    }

    async fn evict(&self, key: &str, reason: &str) {
        log::warn!("Dropping corrupt session cache entry: {reason}");
        if let Err(e) = self.cache.delete(key).await {
            log::warn!("Failed to delete corrupt session cache entry: {e}");
        }
    }

    async fn store(&self, key: &str, session: &Session) {
        let value = match serde_json::to_string(session) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to encode session for cache: {e}");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, value, self.ttl).await {
            log::warn!("Failed to cache verified session: {e}");
        }
    }
}
