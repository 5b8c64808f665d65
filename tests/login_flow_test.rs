// Login orchestration: reuse an existing session or authenticate exactly once
use oathkeeper_login::models::Session;
use oathkeeper_login::providers::{LoginArtifact, ProviderError, ProviderRequest};
use oathkeeper_login::session::LoginOrchestrator;
use oathkeeper_login::testing::MockProvider;
use reqwest::StatusCode;

fn argocd() -> MockProvider {
    MockProvider::new("argo-cd", "argocd.token")
}

#[tokio::test]
async fn test_accepted_cookie_skips_authentication() {
    let provider = argocd().accepting("tok", Session::new("admin"));

    let outcome = LoginOrchestrator::new()
        .login(
            &provider,
            &ProviderRequest::new().with_cookie("tok"),
            Some("/applications"),
        )
        .await
        .unwrap();

    assert_eq!(outcome.redirect_to, "/applications");
    assert_eq!(outcome.artifact, LoginArtifact::None);
    assert_eq!(provider.reuse_calls(), 1);
    assert_eq!(provider.authenticate_calls(), 0);
}

#[tokio::test]
async fn test_missing_cookie_authenticates_once() {
    let provider = argocd();

    let outcome = LoginOrchestrator::new()
        .login(&provider, &ProviderRequest::new(), None)
        .await
        .unwrap();

    assert_eq!(outcome.redirect_to, "/");
    assert_eq!(
        outcome.artifact,
        LoginArtifact::SetCookies(vec!["argocd.token=fresh; Path=/; HttpOnly".to_string()])
    );
    assert_eq!(provider.reuse_calls(), 0);
    assert_eq!(provider.authenticate_calls(), 1);
}

#[tokio::test]
async fn test_rejected_cookie_authenticates_once() {
    let provider = argocd();

    LoginOrchestrator::new()
        .login(&provider, &ProviderRequest::new().with_cookie("stale"), None)
        .await
        .unwrap();

    assert_eq!(provider.reuse_calls(), 1);
    assert_eq!(provider.authenticate_calls(), 1);
}

#[tokio::test]
async fn test_failed_authentication_is_not_retried() {
    let provider = MockProvider::new("ghost", "ghost-admin-api-session")
        .failing_login(StatusCode::UNAUTHORIZED, r#"{"errors":[{"type":"UnauthorizedError"}]}"#);

    let err = LoginOrchestrator::new()
        .login(&provider, &ProviderRequest::new(), Some("/ghost"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Upstream { provider: "ghost", .. }));
    assert_eq!(
        err.to_string(),
        r#"failed to login to ghost: 401 Unauthorized {"errors":[{"type":"UnauthorizedError"}]}"#
    );
    assert_eq!(provider.authenticate_calls(), 1);
}

#[tokio::test]
async fn test_return_url_falls_back_to_provider_default() {
    let provider =
        MockProvider::new("ghost", "ghost-admin-api-session").with_default_return_path("/ghost");
    let orchestrator = LoginOrchestrator::new();

    for return_url in [None, Some(""), Some("//evil.example.com/"), Some("javascript:alert(1)")] {
        let outcome = orchestrator
            .login(&provider, &ProviderRequest::new(), return_url)
            .await
            .unwrap();
        assert_eq!(outcome.redirect_to, "/ghost", "return_url {return_url:?}");
    }

    let outcome = orchestrator
        .login(
            &provider,
            &ProviderRequest::new(),
            Some("https://blog.example.com/ghost/#/site"),
        )
        .await
        .unwrap();
    assert_eq!(outcome.redirect_to, "https://blog.example.com/ghost/#/site");
}

#[tokio::test]
async fn test_forwarded_headers_reach_authenticate() {
    let provider = MockProvider::new("n8n", "n8n-auth").with_forwarded_headers(&["Browser-Id"]);

    LoginOrchestrator::new()
        .login(
            &provider,
            &ProviderRequest::new().with_header("Browser-Id", "b-9"),
            None,
        )
        .await
        .unwrap();

    assert_eq!(provider.last_request().unwrap().header("Browser-Id"), "b-9");
}
