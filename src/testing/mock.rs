//! Scriptable stand-ins for providers and cache backends
//!
//! Both record how often they were called so tests can assert on upstream
//! traffic and cache writes.

use crate::cache::{CacheError, CacheStore};
use crate::models::Session;
use crate::providers::{LoginArtifact, ProviderError, ProviderRequest, SessionProvider};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

enum LoginBehaviour {
    Succeed(LoginArtifact),
    Fail { status: StatusCode, body: String },
}

/// Provider accepting a fixed set of cookies
///
/// # Panics
///
/// Methods panic if an internal lock is poisoned by a panicking test.
pub struct MockProvider {
    name: &'static str,
    cookie_name: &'static str,
    default_return_path: &'static str,
    forwarded_headers: &'static [&'static str],
    accepted: RwLock<HashMap<String, Session>>,
    login: RwLock<LoginBehaviour>,
    verify_calls: AtomicUsize,
    reuse_calls: AtomicUsize,
    authenticate_calls: AtomicUsize,
    last_request: Mutex<Option<ProviderRequest>>,
}

impl MockProvider {
    #[must_use]
    pub fn new(name: &'static str, cookie_name: &'static str) -> Self {
        Self {
            name,
            cookie_name,
            default_return_path: "/",
            forwarded_headers: &[],
            accepted: RwLock::new(HashMap::new()),
            login: RwLock::new(LoginBehaviour::Succeed(LoginArtifact::SetCookies(vec![
                format!("{cookie_name}=fresh; Path=/; HttpOnly"),
            ]))),
            verify_calls: AtomicUsize::new(0),
            reuse_calls: AtomicUsize::new(0),
            authenticate_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn accepting(self, cookie: &str, session: Session) -> Self {
        self.accept(cookie, session);
        self
    }

    #[must_use]
    pub fn with_default_return_path(mut self, path: &'static str) -> Self {
        self.default_return_path = path;
        self
    }

    #[must_use]
    pub fn with_forwarded_headers(mut self, headers: &'static [&'static str]) -> Self {
        self.forwarded_headers = headers;
        self
    }

    #[must_use]
    pub fn with_login_artifact(self, artifact: LoginArtifact) -> Self {
        *self.login.write().unwrap() = LoginBehaviour::Succeed(artifact);
        self
    }

    /// Make `authenticate` fail the way a rejecting upstream would
    #[must_use]
    pub fn failing_login(self, status: StatusCode, body: &str) -> Self {
        *self.login.write().unwrap() = LoginBehaviour::Fail {
            status,
            body: body.to_string(),
        };
        self
    }

    pub fn accept(&self, cookie: &str, session: Session) {
        self.accepted
            .write()
            .unwrap()
            .insert(cookie.to_string(), session);
    }

    /// Stop accepting `cookie`, as if the upstream session was revoked
    pub fn revoke(&self, cookie: &str) {
        self.accepted.write().unwrap().remove(cookie);
    }

    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn reuse_calls(&self) -> usize {
        self.reuse_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn authenticate_calls(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
    }

    /// Request seen by the most recent call
    #[must_use]
    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.last_request.lock().unwrap().clone()
    }

    fn record(&self, request: &ProviderRequest) {
        *self.last_request.lock().unwrap() = Some(request.clone());
    }
}

#[async_trait]
impl SessionProvider for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cookie_name(&self) -> &'static str {
        self.cookie_name
    }

    fn forwarded_headers(&self) -> &'static [&'static str] {
        self.forwarded_headers
    }

    fn default_return_path(&self) -> &'static str {
        self.default_return_path
    }

    async fn verify_existing(&self, request: &ProviderRequest) -> Option<Session> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.record(request);
        let cookie = request.cookie()?;
        self.accepted.read().unwrap().get(cookie).cloned()
    }

    async fn reuse_existing(&self, request: &ProviderRequest) -> Option<LoginArtifact> {
        self.reuse_calls.fetch_add(1, Ordering::SeqCst);
        self.verify_existing(request)
            .await
            .map(|_| LoginArtifact::None)
    }

    async fn authenticate(&self, request: &ProviderRequest) -> Result<LoginArtifact, ProviderError> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        self.record(request);
        match &*self.login.read().unwrap() {
            LoginBehaviour::Succeed(artifact) => Ok(artifact.clone()),
            LoginBehaviour::Fail { status, body } => Err(ProviderError::Upstream {
                provider: self.name,
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

struct ClockEntry {
    value: String,
    expires_at: Duration,
}

/// In-memory cache whose clock only moves when told to
///
/// An entry written at `T` with TTL `d` is visible while the clock is before
/// `T + d`.
///
/// # Panics
///
/// Methods panic if an internal lock is poisoned by a panicking test.
#[derive(Default)]
pub struct ManualClockStore {
    now: Mutex<Duration>,
    entries: Mutex<HashMap<String, ClockEntry>>,
    fail_writes: AtomicBool,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
}

impl ManualClockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }

    /// Make every `set` fail with a backend error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store a raw value regardless of the configured failure mode
    pub fn plant(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = *self.now.lock().unwrap() + ttl;
        self.entries.lock().unwrap().insert(
            key.to_string(),
            ClockEntry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    /// Live value for `key`, without counting as a read
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = *self.now.lock().unwrap();
        self.entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    #[must_use]
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for ManualClockStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("writes disabled".to_string()));
        }
        self.plant(key, &value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "manual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_clock_expiry_boundary() {
        let store = ManualClockStore::new();
        store
            .set("ghost:abc", "v".to_string(), Duration::from_secs(10))
            .await
            .unwrap();

        store.advance(Duration::from_millis(9_999));
        assert_eq!(store.get("ghost:abc").await.unwrap().as_deref(), Some("v"));

        store.advance(Duration::from_millis(1));
        assert_eq!(store.get("ghost:abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_provider_scripting() {
        let provider = MockProvider::new("ghost", "ghost-admin-api-session")
            .accepting("abc", Session::new("42"))
            .failing_login(StatusCode::UNAUTHORIZED, "nope");

        let request = ProviderRequest::new().with_cookie("abc");
        assert_eq!(provider.verify_existing(&request).await, Some(Session::new("42")));

        provider.revoke("abc");
        assert_eq!(provider.verify_existing(&request).await, None);
        assert!(provider.authenticate(&request).await.is_err());
        assert_eq!(provider.verify_calls(), 2);
        assert_eq!(provider.authenticate_calls(), 1);
    }
}
