//! n8n session adapter
//!
//! n8n binds its auth cookie to the browser through the `Browser-Id` header,
//! which is forwarded on every upstream call.

use super::{exchange_call, join_url, json_scalar, verify_call, with_cookie};
use super::{LoginArtifact, ProviderError, ProviderRequest, SessionProvider};
use crate::models::Session;
use crate::settings::ProviderSettings;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

pub const NAME: &str = "n8n";
pub const COOKIE_NAME: &str = "n8n-auth";
pub const BROWSER_ID_HEADER: &str = "Browser-Id";

const LOGIN_PATH: &str = "/rest/login";

pub struct N8n {
    client: Client,
    settings: ProviderSettings,
}

impl N8n {
    #[must_use]
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn login_url(&self) -> String {
        join_url(&self.settings.server_url, LOGIN_PATH)
    }
}

fn with_browser_id(builder: RequestBuilder, request: &ProviderRequest) -> RequestBuilder {
    builder.header(BROWSER_ID_HEADER, request.header(BROWSER_ID_HEADER))
}

fn session_from_login(body: &Value) -> Session {
    Session::with_email(
        json_scalar(body, "/data/id"),
        json_scalar(body, "/data/email"),
    )
}

#[async_trait]
impl SessionProvider for N8n {
    fn name(&self) -> &'static str {
        NAME
    }

    fn cookie_name(&self) -> &'static str {
        COOKIE_NAME
    }

    fn forwarded_headers(&self) -> &'static [&'static str] {
        &[BROWSER_ID_HEADER]
    }

    async fn verify_existing(&self, request: &ProviderRequest) -> Option<Session> {
        let auth = request.cookie()?;
        let builder = with_cookie(
            with_browser_id(self.client.get(self.login_url()), request),
            COOKIE_NAME,
            auth,
        );
        let body = verify_call(NAME, builder).await?;
        Some(session_from_login(&body))
    }

    async fn authenticate(&self, request: &ProviderRequest) -> Result<LoginArtifact, ProviderError> {
        let builder = with_browser_id(self.client.post(self.login_url()), request).json(&json!({
            "emailOrLdapLoginId": self.settings.username,
            "password": self.settings.password,
        }));
        let response = exchange_call(NAME, builder).await?;
        Ok(LoginArtifact::from_set_cookie_headers(response.headers()))
    }
}
