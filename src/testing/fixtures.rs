//! Pre-built test objects

use super::constants::{TEST_EMAIL, TEST_PASSWORD, TEST_SUBJECT, TEST_TTL, TEST_USERNAME};
use crate::cache::CacheStore;
use crate::models::Session;
use crate::providers::{ProviderRegistry, SessionProvider};
use crate::session::SessionResolver;
use crate::settings::ProviderSettings;
use std::sync::Arc;

pub struct TestFixtures;

impl TestFixtures {
    /// Session with the default subject and email
    #[must_use]
    pub fn session() -> Session {
        Session::with_email(TEST_SUBJECT, TEST_EMAIL)
    }

    /// Enabled provider section pointing at `server_url`
    #[must_use]
    pub fn provider_settings(server_url: &str) -> ProviderSettings {
        ProviderSettings {
            server_url: server_url.to_string(),
            username: TEST_USERNAME.to_string(),
            password: TEST_PASSWORD.to_string(),
            origin_url: None,
            realm: None,
            enabled: true,
        }
    }

    /// Resolver over `cache` with the default TTL
    #[must_use]
    pub fn resolver(cache: Arc<dyn CacheStore>) -> SessionResolver {
        SessionResolver::new(cache, TEST_TTL)
    }

    /// Registry holding the given providers
    #[must_use]
    pub fn registry(providers: Vec<Arc<dyn SessionProvider>>) -> ProviderRegistry {
        providers
            .into_iter()
            .fold(ProviderRegistry::new(), ProviderRegistry::with_provider)
    }
}
