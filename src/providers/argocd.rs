//! Argo CD session adapter

use super::{exchange_call, join_url, json_scalar, verify_call, with_cookie};
use super::{LoginArtifact, ProviderError, ProviderRequest, SessionProvider};
use crate::models::Session;
use crate::settings::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const NAME: &str = "argo-cd";
pub const COOKIE_NAME: &str = "argocd.token";

const USERINFO_PATH: &str = "/api/v1/session/userinfo";
const SESSION_PATH: &str = "/api/v1/session";

pub struct ArgoCd {
    client: Client,
    settings: ProviderSettings,
}

impl ArgoCd {
    #[must_use]
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.settings.server_url, path)
    }
}

/// Argo CD answers anonymous sessions with `200` and `loggedIn: false`
fn session_from_userinfo(body: &Value) -> Option<Session> {
    if body.get("loggedIn").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    Some(Session::new(json_scalar(body, "/username")))
}

#[async_trait]
impl SessionProvider for ArgoCd {
    fn name(&self) -> &'static str {
        NAME
    }

    fn cookie_name(&self) -> &'static str {
        COOKIE_NAME
    }

    async fn verify_existing(&self, request: &ProviderRequest) -> Option<Session> {
        let token = request.cookie()?;
        let builder = with_cookie(self.client.get(self.url(USERINFO_PATH)), COOKIE_NAME, token);
        let body = verify_call(NAME, builder).await?;
        session_from_userinfo(&body)
    }

    async fn authenticate(&self, _request: &ProviderRequest) -> Result<LoginArtifact, ProviderError> {
        let builder = self.client.post(self.url(SESSION_PATH)).json(&json!({
            "username": self.settings.username,
            "password": self.settings.password,
        }));
        let response = exchange_call(NAME, builder).await?;
        Ok(LoginArtifact::from_set_cookie_headers(response.headers()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_userinfo_requires_logged_in() {
        let session = session_from_userinfo(&json!({"loggedIn": true, "username": "admin"}));
        assert_eq!(session, Some(Session::new("admin")));

        assert_eq!(
            session_from_userinfo(&json!({"loggedIn": false, "username": "admin"})),
            None
        );
        assert_eq!(session_from_userinfo(&json!({"username": "admin"})), None);
        assert_eq!(session_from_userinfo(&Value::Null), None);
    }

    #[test]
    fn test_logged_in_without_username_yields_empty_subject() {
        let session = session_from_userinfo(&json!({"loggedIn": true})).unwrap();
        assert!(!session.is_valid());
    }
}
