use super::{argocd, ghost, n8n, nocodb, proxmox, SessionProvider};
use crate::settings::LoginServerSettings;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

/// Providers available to the HTTP routes, keyed by route name
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn SessionProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one provider per enabled settings section
    #[must_use]
    pub fn from_settings(settings: &LoginServerSettings, client: &Client) -> Self {
        let mut registry = Self::new();
        for (name, provider_settings) in settings.configured_providers() {
            let provider: Arc<dyn SessionProvider> = match name {
                argocd::NAME => Arc::new(argocd::ArgoCd::new(
                    client.clone(),
                    provider_settings.clone(),
                )),
                ghost::NAME => Arc::new(ghost::Ghost::new(client.clone(), provider_settings.clone())),
                n8n::NAME => Arc::new(n8n::N8n::new(client.clone(), provider_settings.clone())),
                proxmox::NAME => Arc::new(proxmox::Proxmox::new(
                    client.clone(),
                    provider_settings.clone(),
                )),
                nocodb::NAME => Arc::new(nocodb::NocoDb::new(
                    client.clone(),
                    provider_settings.clone(),
                )),
                other => {
                    log::warn!("Ignoring settings for unsupported provider {other}");
                    continue;
                }
            };
            log::info!(
                "Registered provider {} -> {}",
                provider.name(),
                provider_settings.server_url
            );
            registry.register(provider);
        }
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn SessionProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn SessionProvider>) -> Self {
        self.register(provider);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SessionProvider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
