use crate::providers::ProviderRegistry;
use crate::session::LoginOrchestrator;
use crate::utils::cookie_utils::provider_request;
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpRequest, HttpResponse};

/// First `return_url` in a query string
///
/// Repeated or malformed parameters never reject the request; the first
/// value wins and a missing one falls back to the provider default.
#[must_use]
pub fn return_url_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "return_url")
        .map(|(_, value)| value.into_owned())
}

/// `GET /login/{provider}?return_url=...`
///
/// Signs the browser in with the configured service account and redirects it
/// back. Credential exchange failures are reported as 500.
pub async fn login(
    path: web::Path<String>,
    req: HttpRequest,
    registry: web::Data<ProviderRegistry>,
    orchestrator: web::Data<LoginOrchestrator>,
) -> HttpResponse {
    let Some(provider) = registry.get(&path) else {
        return ResponseBuilder::unknown_provider();
    };

    let return_url = return_url_param(req.query_string());
    let request = provider_request(&req, provider.as_ref());
    match orchestrator
        .login(provider.as_ref(), &request, return_url.as_deref())
        .await
    {
        Ok(outcome) => ResponseBuilder::redirect_with_artifact(&outcome.redirect_to, outcome.artifact),
        Err(e) => {
            log::error!("{e}");
            ResponseBuilder::login_failed(&e.to_string())
        }
    }
}
