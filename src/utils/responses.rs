//! HTTP response helpers
//!
//! Every error body has the same `{"error": "..."}` shape Oathkeeper expects.
//! The fixed ones are serialized once and reused.

use crate::models::{ErrorResponse, Session, INVALID_SESSION};
use crate::providers::LoginArtifact;
use actix_web::http::header;
use actix_web::HttpResponse;

// ===============================
// CACHED RESPONSES
// ===============================

static CACHED_RESPONSES: std::sync::LazyLock<CachedResponses> =
    std::sync::LazyLock::new(CachedResponses::new);

/// Pre-serialized bodies for responses sent on most requests
struct CachedResponses {
    invalid_session: String,
    unknown_provider: String,
}

impl CachedResponses {
    fn new() -> Self {
        Self {
            invalid_session: Self::create_json(INVALID_SESSION),
            unknown_provider: Self::create_json("unknown provider"),
        }
    }

    fn create_json(error: &str) -> String {
        serde_json::json!({ "error": error }).to_string()
    }
}

fn json_body(mut builder: actix_web::HttpResponseBuilder, body: String) -> HttpResponse {
    builder
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .body(body)
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// 200 with the resolved session
    #[must_use]
    pub fn session(session: &Session) -> HttpResponse {
        HttpResponse::Ok().json(session)
    }

    /// 401 `{"error":"invalid session"}`
    #[must_use]
    pub fn invalid_session() -> HttpResponse {
        json_body(
            HttpResponse::Unauthorized(),
            CACHED_RESPONSES.invalid_session.clone(),
        )
    }

    /// 404 for a provider that is not configured
    #[must_use]
    pub fn unknown_provider() -> HttpResponse {
        json_body(
            HttpResponse::NotFound(),
            CACHED_RESPONSES.unknown_provider.clone(),
        )
    }

    /// 500 carrying the login diagnostic
    #[must_use]
    pub fn login_failed(message: &str) -> HttpResponse {
        HttpResponse::InternalServerError().json(ErrorResponse::new(message))
    }

    /// 302 to `location`, relaying whatever the login produced
    #[must_use]
    pub fn redirect_with_artifact(location: &str, artifact: LoginArtifact) -> HttpResponse {
        let mut builder = HttpResponse::Found();
        match artifact {
            LoginArtifact::None => {}
            LoginArtifact::SetCookies(values) => {
                for value in values {
                    builder.append_header((header::SET_COOKIE, value));
                }
            }
            LoginArtifact::Cookie(cookie) => {
                builder.cookie(cookie);
            }
        }
        builder
            .insert_header((header::LOCATION, location.to_string()))
            .finish()
    }

    /// Plain text body, used by the observability endpoints
    #[must_use]
    pub fn text(mut builder: actix_web::HttpResponseBuilder, body: impl Into<String>) -> HttpResponse {
        builder
            .content_type("text/plain; charset=utf-8")
            .body(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;

    #[actix_web::test]
    async fn test_invalid_session_body() {
        let response = ResponseBuilder::invalid_session();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"error":"invalid session"}"#);
    }

    #[test]
    fn test_redirect_relays_every_set_cookie() {
        let response = ResponseBuilder::redirect_with_artifact(
            "/ghost",
            LoginArtifact::SetCookies(vec![
                "a=1; Path=/".to_string(),
                "b=2; Path=/; HttpOnly".to_string(),
            ]),
        );

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/ghost");
        let cookies: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["a=1; Path=/", "b=2; Path=/; HttpOnly"]);
    }

    #[test]
    fn test_redirect_with_built_cookie() {
        let response = ResponseBuilder::redirect_with_artifact(
            "/",
            LoginArtifact::Cookie(Cookie::new("PVEAuthCookie", "t")),
        );
        let cookie = response.cookies().next().unwrap();
        assert_eq!(cookie.name(), "PVEAuthCookie");
        assert_eq!(cookie.value(), "t");
    }

    #[test]
    fn test_redirect_without_artifact_sets_no_cookie() {
        let response = ResponseBuilder::redirect_with_artifact("/", LoginArtifact::None);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
