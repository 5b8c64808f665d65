use crate::providers::{ProviderRequest, SessionProvider};
use actix_web::cookie::Cookie;
use actix_web::http::header::COOKIE;
use actix_web::HttpRequest;

/// Raw value of a request cookie
///
/// Values are taken as sent, without percent-decoding. Pairs that do not
/// parse are skipped.
#[must_use]
pub fn extract_cookie_value(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    req.headers()
        .get_all(COOKIE)
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .find(|cookie| cookie.name() == cookie_name)
        .map(|cookie| cookie.value().to_string())
}

/// Collect the provider cookie and forwarded headers from an inbound request
///
/// Forwarded headers the browser did not send are passed on as empty values.
#[must_use]
pub fn provider_request(req: &HttpRequest, provider: &dyn SessionProvider) -> ProviderRequest {
    let mut request = ProviderRequest::new();
    if let Some(cookie) = extract_cookie_value(req, provider.cookie_name()) {
        request = request.with_cookie(cookie);
    }
    for name in provider.forwarded_headers() {
        let value = req
            .headers()
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        request = request.with_header(*name, value);
    }
    request
}
