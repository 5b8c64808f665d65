use crate::providers::ProviderRegistry;
use crate::session::{Resolution, SessionResolver};
use crate::utils::cookie_utils::provider_request;
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpRequest, HttpResponse};

/// `GET /session/{provider}`
///
/// Oathkeeper's cookie session authenticator calls this with the browser's
/// cookies and expects either the session JSON or a 401.
pub async fn session(
    path: web::Path<String>,
    req: HttpRequest,
    registry: web::Data<ProviderRegistry>,
    resolver: web::Data<SessionResolver>,
) -> HttpResponse {
    let Some(provider) = registry.get(&path) else {
        return ResponseBuilder::unknown_provider();
    };

    let request = provider_request(&req, provider.as_ref());
    match resolver.resolve(provider.as_ref(), &request).await {
        Resolution::Authenticated(session) => ResponseBuilder::session(&session),
        Resolution::Unauthenticated => ResponseBuilder::invalid_session(),
    }
}
