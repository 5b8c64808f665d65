//! Proxmox VE session adapter
//!
//! Proxmox issues its ticket in the JSON body rather than as a cookie, so the
//! login artifact is a cookie built here.

use super::{exchange_call, join_url, json_scalar, verify_call, with_cookie};
use super::{LoginArtifact, ProviderError, ProviderRequest, SessionProvider};
use crate::models::Session;
use crate::settings::ProviderSettings;
use actix_web::cookie::{Cookie, SameSite};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

pub const NAME: &str = "proxmox";
pub const COOKIE_NAME: &str = "PVEAuthCookie";

const VERSION_PATH: &str = "/api2/extjs/version";
const TICKET_PATH: &str = "/api2/extjs/access/ticket";

pub struct Proxmox {
    client: Client,
    settings: ProviderSettings,
}

impl Proxmox {
    #[must_use]
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.settings.server_url, path)
    }
}

/// The extjs formatter reports failures with `success: 0` and a 200 status
fn is_extjs_failure(body: &Value) -> bool {
    match body.get("success") {
        Some(Value::Number(n)) => n.as_i64() == Some(0),
        Some(Value::Bool(b)) => !b,
        _ => false,
    }
}

/// Escape a ticket the way the Proxmox web UI stores it
fn escape_ticket(ticket: &str) -> String {
    ticket.replace(':', "%3A").replace('=', "%3D")
}

/// Cookie readable by the Proxmox web UI, hence not `HttpOnly`
fn ticket_cookie(ticket: &str) -> Cookie<'static> {
    Cookie::build(COOKIE_NAME, escape_ticket(ticket))
        .path("/")
        .secure(true)
        .http_only(false)
        .same_site(SameSite::Lax)
        .finish()
}

#[async_trait]
impl SessionProvider for Proxmox {
    fn name(&self) -> &'static str {
        NAME
    }

    fn cookie_name(&self) -> &'static str {
        COOKIE_NAME
    }

    async fn verify_existing(&self, request: &ProviderRequest) -> Option<Session> {
        let ticket = request.cookie()?;
        let builder = with_cookie(self.client.get(self.url(VERSION_PATH)), COOKIE_NAME, ticket);
        let body = verify_call(NAME, builder).await?;
        if is_extjs_failure(&body) {
            log::debug!("{NAME} rejected session: {body}");
            return None;
        }
        Some(Session::new(self.settings.username.clone()))
    }

    async fn authenticate(&self, _request: &ProviderRequest) -> Result<LoginArtifact, ProviderError> {
        let form = [
            ("realm", self.settings.realm()),
            ("new-format", "1"),
            ("username", self.settings.username.as_str()),
            ("password", self.settings.password.as_str()),
        ];
        let builder = self.client.post(self.url(TICKET_PATH)).form(&form);
        let response = exchange_call(NAME, builder).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: NAME,
                source,
            })?;

        let ticket = json_scalar(&body, "/data/ticket");
        if ticket.is_empty() {
            return Err(ProviderError::InvalidResponse {
                provider: NAME,
                message: format!("no ticket in response {body}"),
            });
        }
        Ok(LoginArtifact::Cookie(ticket_cookie(&ticket)))
    }
}
