//! Third party session providers
//!
//! Each supported application implements [`SessionProvider`]. The resolver and
//! the login orchestrator are written once against the trait and pick a
//! provider from the [`ProviderRegistry`] by route name.
//!
//! Upstream calls are plain futures owned by the inbound request handler.
//! When the browser disconnects actix drops the handler future, which drops
//! and cancels any in-flight reqwest call. The shared client also carries a
//! request timeout.

pub mod argocd;
pub mod ghost;
pub mod n8n;
pub mod nocodb;
pub mod proxmox;
mod registry;

pub use registry::ProviderRegistry;

use crate::models::Session;
use crate::settings::UpstreamSettings;
use actix_web::cookie::Cookie;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Inbound request data a provider may use on its upstream calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRequest {
    cookie: Option<String>,
    headers: Vec<(String, String)>,
}

impl ProviderRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Raw value of the provider's session cookie
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Forwarded header value, empty when the browser did not send it
    #[must_use]
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map_or("", |(_, value)| value.as_str())
    }
}

/// What a successful login hands back to the browser
#[derive(Debug, Clone, PartialEq)]
pub enum LoginArtifact {
    /// The browser's existing cookie is still good
    None,
    /// `Set-Cookie` values copied from the upstream response
    SetCookies(Vec<String>),
    /// Cookie built from the upstream response body
    Cookie(Cookie<'static>),
}

impl LoginArtifact {
    /// Relay every `Set-Cookie` header of an upstream response
    #[must_use]
    pub fn from_set_cookie_headers(headers: &HeaderMap) -> Self {
        Self::SetCookies(
            headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .map(ToString::to_string)
                .collect(),
        )
    }
}

/// Failure of a credential exchange
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to login to {provider}: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to login to {provider}: {status} {body}")]
    Upstream {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("failed to login to {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

/// Capability set every third party integration provides
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Route segment and cache key namespace, e.g. `argo-cd`
    fn name(&self) -> &'static str;

    /// Browser cookie carrying the application's session
    fn cookie_name(&self) -> &'static str;

    /// Inbound headers forwarded unchanged on every upstream call
    fn forwarded_headers(&self) -> &'static [&'static str] {
        &[]
    }

    /// Redirect target when the caller gives no `return_url`
    fn default_return_path(&self) -> &'static str {
        "/"
    }

    /// Check the cookie against the live application without changing any state
    ///
    /// Any failure, including transport errors, yields `None`.
    async fn verify_existing(&self, request: &ProviderRequest) -> Option<Session>;

    /// Login-time check of an existing cookie
    ///
    /// `Some` means no credential exchange is needed; the artifact, if any,
    /// is relayed to the browser.
    async fn reuse_existing(&self, request: &ProviderRequest) -> Option<LoginArtifact> {
        self.verify_existing(request)
            .await
            .map(|_| LoginArtifact::None)
    }

    /// Exchange the configured service credentials for a new session
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success upstream response
    async fn authenticate(&self, request: &ProviderRequest) -> Result<LoginArtifact, ProviderError>;
}

/// Build the outbound client shared by all providers
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised
pub fn build_http_client(settings: &UpstreamSettings) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .danger_accept_invalid_certs(settings.insecure_skip_verify)
        .build()
}

/// Join a configured server URL and an API path
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Attach a single session cookie to an upstream request
pub(crate) fn with_cookie(builder: RequestBuilder, name: &str, value: &str) -> RequestBuilder {
    builder.header(COOKIE, format!("{name}={value}"))
}

/// Read a JSON scalar at `pointer` as text
///
/// Strings are returned as-is, numbers and booleans are rendered, anything
/// else (including a missing field) is empty.
#[must_use]
pub fn json_scalar(body: &Value, pointer: &str) -> String {
    match body.pointer(pointer) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => String::new(),
    }
}

/// Send a read-only session check
///
/// Returns the decoded body of a 2xx response, `Value::Null` when the body is
/// not JSON, and `None` for every other outcome.
pub(crate) async fn verify_call(provider: &'static str, builder: RequestBuilder) -> Option<Value> {
    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            log::debug!("{provider} session check failed: {e}");
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        log::debug!("{provider} rejected session: {status}");
        return None;
    }

    match response.json::<Value>().await {
        Ok(body) => Some(body),
        Err(e) => {
            log::debug!("{provider} session check returned a non JSON body: {e}");
            Some(Value::Null)
        }
    }
}

/// Send a credential exchange, turning error statuses into `ProviderError`
pub(crate) async fn exchange_call(
    provider: &'static str,
    builder: RequestBuilder,
) -> Result<Response, ProviderError> {
    let response = builder
        .send()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Upstream {
            provider,
            status,
            body,
        });
    }
    Ok(response)
}
