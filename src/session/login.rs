//! Reuse-or-authenticate login flow
//!
//! A browser that already holds a working provider cookie is sent straight to
//! its destination. Otherwise the configured service account is exchanged for
//! a new session exactly once; failures are not retried.

use crate::providers::{LoginArtifact, ProviderError, ProviderRequest, SessionProvider};
use crate::utils::redirect_validator::validate_return_url;

/// Where to send the browser and what to hand it
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub redirect_to: String,
    pub artifact: LoginArtifact,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoginOrchestrator;

impl LoginOrchestrator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Run the login flow for `provider`
    ///
    /// # Errors
    ///
    /// Returns the provider error when the credential exchange fails
    pub async fn login(
        &self,
        provider: &dyn SessionProvider,
        request: &ProviderRequest,
        return_url: Option<&str>,
    ) -> Result<LoginOutcome, ProviderError> {
        let redirect_to = return_url
            .and_then(validate_return_url)
            .unwrap_or_else(|| provider.default_return_path().to_string());

        if request.cookie().is_some() {
            if let Some(artifact) = provider.reuse_existing(request).await {
                log::debug!("Reusing existing {} session", provider.name());
                return Ok(LoginOutcome {
                    redirect_to,
                    artifact,
                });
            }
        }

        log::info!("Logging in to {} with the service account", provider.name());
        let artifact = provider.authenticate(request).await?;
        Ok(LoginOutcome {
            redirect_to,
            artifact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;
    use async_trait::async_trait;

    struct GhostLike {
        accepts: bool,
    }

    #[async_trait]
    impl SessionProvider for GhostLike {
        fn name(&self) -> &'static str {
            "ghost"
        }

        fn cookie_name(&self) -> &'static str {
            "ghost-admin-api-session"
        }

        fn default_return_path(&self) -> &'static str {
            "/ghost"
        }

        async fn verify_existing(&self, _request: &ProviderRequest) -> Option<Session> {
            self.accepts.then(|| Session::new("1"))
        }

        async fn authenticate(
            &self,
            _request: &ProviderRequest,
        ) -> Result<LoginArtifact, ProviderError> {
            Ok(LoginArtifact::SetCookies(vec!["ghost-admin-api-session=new".to_string()]))
        }
    }

    #[tokio::test]
    async fn test_unsafe_return_url_falls_back_to_default() {
        let outcome = LoginOrchestrator::new()
            .login(
                &GhostLike { accepts: false },
                &ProviderRequest::new(),
                Some("//evil.example.com"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.redirect_to, "/ghost");
        assert_eq!(
            outcome.artifact,
            LoginArtifact::SetCookies(vec!["ghost-admin-api-session=new".to_string()])
        );
    }

    #[tokio::test]
    async fn test_reused_session_relays_nothing() {
        let outcome = LoginOrchestrator::new()
            .login(
                &GhostLike { accepts: true },
                &ProviderRequest::new().with_cookie("abc"),
                Some("/ghost/#/posts"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.redirect_to, "/ghost/#/posts");
        assert_eq!(outcome.artifact, LoginArtifact::None);
    }
}
