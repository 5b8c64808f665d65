//! NocoDB session adapter
//!
//! NocoDB's refresh token cannot be checked without rotating it, so session
//! resolution accepts the cookie as presented and attributes it to the
//! configured account. Login rotates it through the refresh endpoint.

use super::{exchange_call, join_url, with_cookie};
use super::{LoginArtifact, ProviderError, ProviderRequest, SessionProvider};
use crate::models::Session;
use crate::settings::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub const NAME: &str = "nocodb";
pub const COOKIE_NAME: &str = "refresh_token";

const REFRESH_PATH: &str = "/auth/token/refresh";
const SIGNIN_PATH: &str = "/auth/user/signin";

pub struct NocoDb {
    client: Client,
    settings: ProviderSettings,
}

impl NocoDb {
    #[must_use]
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.settings.server_url, path)
    }
}

#[async_trait]
impl SessionProvider for NocoDb {
    fn name(&self) -> &'static str {
        NAME
    }

    fn cookie_name(&self) -> &'static str {
        COOKIE_NAME
    }

    async fn verify_existing(&self, request: &ProviderRequest) -> Option<Session> {
        request.cookie()?;
        Some(Session::new(self.settings.username.clone()))
    }

    async fn reuse_existing(&self, request: &ProviderRequest) -> Option<LoginArtifact> {
        let token = request.cookie()?;
        let builder = with_cookie(self.client.post(self.url(REFRESH_PATH)), COOKIE_NAME, token);
        match exchange_call(NAME, builder).await {
            Ok(response) => Some(LoginArtifact::from_set_cookie_headers(response.headers())),
            Err(e) => {
                log::debug!("{NAME} refresh token not reusable: {e}");
                None
            }
        }
    }

    async fn authenticate(&self, _request: &ProviderRequest) -> Result<LoginArtifact, ProviderError> {
        let builder = self.client.post(self.url(SIGNIN_PATH)).json(&json!({
            "email": self.settings.username,
            "password": self.settings.password,
        }));
        let response = exchange_call(NAME, builder).await?;
        Ok(LoginArtifact::from_set_cookie_headers(response.headers()))
    }
}
