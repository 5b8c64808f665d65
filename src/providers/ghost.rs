//! Ghost admin session adapter
//!
//! Ghost refuses admin API calls that do not look like they came through its
//! own HTTPS origin, so every upstream call carries `X-Forwarded-Proto` and
//! `Origin`.

use super::{exchange_call, join_url, json_scalar, verify_call, with_cookie};
use super::{LoginArtifact, ProviderError, ProviderRequest, SessionProvider};
use crate::models::Session;
use crate::settings::ProviderSettings;
use async_trait::async_trait;
use reqwest::header::ORIGIN;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

pub const NAME: &str = "ghost";
pub const COOKIE_NAME: &str = "ghost-admin-api-session";

const ME_PATH: &str = "/ghost/api/admin/users/me/";
const SESSION_PATH: &str = "/ghost/api/admin/session";

pub struct Ghost {
    client: Client,
    settings: ProviderSettings,
}

impl Ghost {
    #[must_use]
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.settings.server_url, path)
    }

    fn with_origin(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("X-Forwarded-Proto", "https")
            .header(ORIGIN, self.settings.origin_url())
    }
}

fn session_from_me(body: &Value) -> Session {
    Session::with_email(
        json_scalar(body, "/users/0/id"),
        json_scalar(body, "/users/0/email"),
    )
}

#[async_trait]
impl SessionProvider for Ghost {
    fn name(&self) -> &'static str {
        NAME
    }

    fn cookie_name(&self) -> &'static str {
        COOKIE_NAME
    }

    fn default_return_path(&self) -> &'static str {
        "/ghost"
    }

    async fn verify_existing(&self, request: &ProviderRequest) -> Option<Session> {
        let session = request.cookie()?;
        let builder = with_cookie(
            self.with_origin(self.client.get(self.url(ME_PATH))),
            COOKIE_NAME,
            session,
        );
        let body = verify_call(NAME, builder).await?;
        Some(session_from_me(&body))
    }

    async fn authenticate(&self, _request: &ProviderRequest) -> Result<LoginArtifact, ProviderError> {
        let builder = self
            .with_origin(self.client.post(self.url(SESSION_PATH)))
            .json(&json!({
                "username": self.settings.username,
                "password": self.settings.password,
            }));
        let response = exchange_call(NAME, builder).await?;
        Ok(LoginArtifact::from_set_cookie_headers(response.headers()))
    }
}
