use log::{debug, warn};

// Schemes accepted for absolute return URLs
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

const MAX_RETURN_URL_LEN: usize = 2048;

/// Validate a post-login `return_url`
///
/// Accepts a path relative to the current host or an absolute `http(s)` URL.
/// Returns `None` for anything else so the caller can fall back to the
/// provider default instead of redirecting somewhere unexpected.
#[must_use]
pub fn validate_return_url(return_url: &str) -> Option<String> {
    if return_url.is_empty() {
        return None;
    }
    if return_url.len() > MAX_RETURN_URL_LEN {
        warn!("Ignoring return_url of {} characters", return_url.len());
        return None;
    }
    if has_control_characters(return_url) {
        warn!("Ignoring return_url with control characters");
        return None;
    }

    if is_relative_path(return_url) {
        debug!("Validated relative return_url: {return_url}");
        return Some(return_url.to_string());
    }

    match url::Url::parse(return_url) {
        Ok(parsed) if ALLOWED_SCHEMES.contains(&parsed.scheme()) && parsed.has_host() => {
            debug!("Validated absolute return_url: {return_url}");
            Some(return_url.to_string())
        }
        Ok(parsed) => {
            warn!("Ignoring return_url with scheme '{}'", parsed.scheme());
            None
        }
        Err(e) => {
            warn!("Ignoring unparsable return_url '{return_url}': {e}");
            None
        }
    }
}

/// Path on the current host; `//host` and `/\host` are browser-relative to the scheme
fn is_relative_path(value: &str) -> bool {
    value.starts_with('/') && !value.starts_with("//") && !value.starts_with("/\\")
}

fn has_control_characters(value: &str) -> bool {
    value.chars().any(char::is_control)
        || urlencoding::decode(value).is_ok_and(|decoded| decoded.chars().any(char::is_control))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_are_accepted() {
        assert_eq!(validate_return_url("/").as_deref(), Some("/"));
        assert_eq!(
            validate_return_url("/ghost/#/dashboard").as_deref(),
            Some("/ghost/#/dashboard")
        );
        assert_eq!(
            validate_return_url("/applications?proj=default").as_deref(),
            Some("/applications?proj=default")
        );
    }

    #[test]
    fn test_absolute_http_urls_are_accepted() {
        assert_eq!(
            validate_return_url("https://argocd.example.com/applications").as_deref(),
            Some("https://argocd.example.com/applications")
        );
        assert!(validate_return_url("http://n8n.internal:5678/").is_some());
    }

    #[test]
    fn test_unsafe_values_are_rejected() {
        for value in [
            "",
            "//evil.example.com",
            "/\\evil.example.com",
            "javascript:alert(1)",
            "data:text/html,hi",
            "ftp://files.example.com",
            "relative/path",
            "/path%0d%0aSet-Cookie:x=y",
            "/path\nwith-newline",
        ] {
            assert_eq!(validate_return_url(value), None, "{value:?} should be rejected");
        }
    }

    #[test]
    fn test_overlong_value_is_rejected() {
        let value = format!("/{}", "a".repeat(MAX_RETURN_URL_LEN));
        assert_eq!(validate_return_url(&value), None);
    }
}
