use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Directory that may hold a `Settings.toml` overriding the working directory one
pub const CONFIG_DIR_ENV: &str = "LOGIN_SERVER_CONFIG_DIR";

/// Settings file name looked up in the working directory and in `CONFIG_DIR_ENV`
pub const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoginServerSettings {
    pub application: ApplicationSettings,
    pub o11y: O11ySettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub upstream: UpstreamSettings,
    #[serde(rename = "argo-cd")]
    pub argo_cd: Option<ProviderSettings>,
    pub ghost: Option<ProviderSettings>,
    pub n8n: Option<ProviderSettings>,
    pub proxmox: Option<ProviderSettings>,
    pub nocodb: Option<ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

/// Listener for `/health` and `/metrics`, kept off the main port
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct O11ySettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// `console` or `json`
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheSettings {
    /// Lifetime of every cached session, e.g. `15m`, `900s`, `900`
    pub ttl: String,
    pub redis: RedisSettings,
    pub memory: MemorySettings,
}

/// Shared Redis backend; an empty host selects the in-process cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MemorySettings {
    pub max_capacity: u64,
}

/// Outbound HTTP client settings shared by every provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UpstreamSettings {
    pub timeout_seconds: u64,
    /// Accept self-signed upstream certificates (common for Proxmox)
    pub insecure_skip_verify: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProviderSettings {
    pub server_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,

    /// Ghost only: value sent as the `Origin` header
    #[serde(default)]
    pub origin_url: Option<String>,
    /// Proxmox only: authentication realm, `pam` when unset
    #[serde(default)]
    pub realm: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for O11ySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "console".to_string(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: "15m".to_string(),
            redis: RedisSettings::default(),
            memory: MemorySettings::default(),
        }
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 6379,
            db: 0,
            password: String::new(),
        }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            insecure_skip_verify: false,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            username: String::new(),
            password: String::new(),
            origin_url: None,
            realm: None,
            enabled: true,
        }
    }
}

impl LoginServerSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - The resulting settings fail validation
    pub fn load() -> Result<Self> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);

        settings.validate()?;
        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `LOGIN_SERVER_CONFIG_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    fn load_base_settings() -> Result<Self> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from(SETTINGS_FILE);
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(config_dir) = std::env::var(CONFIG_DIR_ENV) {
            let config_path = std::path::Path::new(&config_dir).join(SETTINGS_FILE);
            if config_path.exists() {
                settings = Self::from_file(&config_path)?;
                println!("✓ Overriding settings from {}", config_path.display());
            } else {
                println!(
                    "ℹ {CONFIG_DIR_ENV} set but no {SETTINGS_FILE} found at: {}",
                    config_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let toml_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        basic_toml::from_str(&toml_content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(settings);
        Self::apply_logging_env_overrides(&mut settings.logging);
        Self::apply_cache_env_overrides(&mut settings.cache);
        Self::apply_upstream_env_overrides(&mut settings.upstream);

        Self::apply_provider_env_overrides("ARGO_CD", &mut settings.argo_cd);
        Self::apply_provider_env_overrides("GHOST", &mut settings.ghost);
        Self::apply_provider_env_overrides("N8N", &mut settings.n8n);
        Self::apply_provider_env_overrides("PROXMOX", &mut settings.proxmox);
        Self::apply_provider_env_overrides("NOCODB", &mut settings.nocodb);
    }

    fn apply_application_env_overrides(settings: &mut Self) {
        if let Ok(host) = std::env::var("HOST") {
            settings.application.host = host;
        }
        Self::apply_parsed_env_override("PORT", &mut settings.application.port);
        if let Ok(host) = std::env::var("O11Y_HOST") {
            settings.o11y.host = host;
        }
        Self::apply_parsed_env_override("O11Y_PORT", &mut settings.o11y.port);
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
        if let Ok(log_format) = std::env::var("LOG_FORMAT") {
            logging_settings.format = log_format;
        }
    }

    fn apply_cache_env_overrides(cache_settings: &mut CacheSettings) {
        if let Ok(ttl) = std::env::var("CACHE_TTL") {
            cache_settings.ttl = ttl;
        }
        if let Ok(host) = std::env::var("CACHE_REDIS_HOST") {
            cache_settings.redis.host = host;
        }
        Self::apply_parsed_env_override("CACHE_REDIS_PORT", &mut cache_settings.redis.port);
        Self::apply_parsed_env_override("CACHE_REDIS_DB", &mut cache_settings.redis.db);
        if let Ok(password) = std::env::var("CACHE_REDIS_PASSWORD") {
            cache_settings.redis.password = password;
        }
    }

    fn apply_upstream_env_overrides(upstream_settings: &mut UpstreamSettings) {
        Self::apply_parsed_env_override(
            "UPSTREAM_TIMEOUT_SECONDS",
            &mut upstream_settings.timeout_seconds,
        );
        Self::apply_parsed_env_override(
            "UPSTREAM_INSECURE_SKIP_VERIFY",
            &mut upstream_settings.insecure_skip_verify,
        );
    }

    /// Apply `<PREFIX>_SERVER_URL`, `<PREFIX>_USERNAME` and `<PREFIX>_PASSWORD`,
    /// creating the provider section when any of them is set
    fn apply_provider_env_overrides(prefix: &str, provider: &mut Option<ProviderSettings>) {
        let env = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();

        if let Some(server_url) = env("SERVER_URL") {
            provider.get_or_insert_with(ProviderSettings::default).server_url = server_url;
        }
        if let Some(username) = env("USERNAME") {
            provider.get_or_insert_with(ProviderSettings::default).username = username;
        }
        if let Some(password) = env("PASSWORD") {
            provider.get_or_insert_with(ProviderSettings::default).password = password;
        }

        if let Some(section) = provider.as_mut() {
            if let Some(origin_url) = env("ORIGIN_URL") {
                section.origin_url = Some(origin_url);
            }
            if let Some(realm) = env("REALM") {
                section.realm = Some(realm);
            }
        }
    }

    /// Helper function to apply parsed environment variable overrides
    fn apply_parsed_env_override<T: std::str::FromStr>(env_var: &str, target: &mut T) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<T>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Check the settings for values that would only fail later at runtime
    ///
    /// # Errors
    ///
    /// Returns an error if the cache TTL is unparsable or zero, or an enabled
    /// provider has no server URL
    pub fn validate(&self) -> Result<()> {
        let ttl = self.cache.ttl()?;
        if ttl.is_zero() {
            bail!("cache.ttl must be greater than zero");
        }

        for (name, provider) in self.configured_providers() {
            if provider.server_url.trim().is_empty() {
                bail!("{name}.server-url is required when {name} is enabled");
            }
            url::Url::parse(&provider.server_url)
                .with_context(|| format!("{name}.server-url is not a valid URL"))?;
        }
        Ok(())
    }

    /// Enabled provider sections keyed by provider name
    #[must_use]
    pub fn configured_providers(&self) -> Vec<(&'static str, &ProviderSettings)> {
        [
            ("argo-cd", self.argo_cd.as_ref()),
            ("ghost", self.ghost.as_ref()),
            ("n8n", self.n8n.as_ref()),
            ("proxmox", self.proxmox.as_ref()),
            ("nocodb", self.nocodb.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, provider)| provider.filter(|p| p.enabled).map(|p| (name, p)))
        .collect()
    }

    /// Get the bind address for the main server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get the bind address for the observability server
    #[must_use]
    pub fn get_o11y_bind_address(&self) -> String {
        format!("{}:{}", self.o11y.host, self.o11y.port)
    }
}

impl CacheSettings {
    /// Parsed cache entry lifetime
    ///
    /// # Errors
    ///
    /// Returns an error if `ttl` is not a recognised duration
    pub fn ttl(&self) -> Result<Duration> {
        parse_duration(&self.ttl).with_context(|| format!("invalid cache.ttl {:?}", self.ttl))
    }
}

impl RedisSettings {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.host.trim().is_empty()
    }

    /// Connection URL in the form accepted by the redis client
    #[must_use]
    pub fn connection_url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.db)
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(&self.password),
                self.host,
                self.port,
                self.db
            )
        }
    }
}

impl ProviderSettings {
    /// Ghost `Origin` header, falling back to the server URL
    #[must_use]
    pub fn origin_url(&self) -> &str {
        self.origin_url.as_deref().unwrap_or(&self.server_url)
    }

    /// Proxmox realm
    #[must_use]
    pub fn realm(&self) -> &str {
        self.realm.as_deref().unwrap_or("pam")
    }
}

/// Parse `<n>ms`, `<n>s`, `<n>m`, `<n>h` or a bare number of seconds
///
/// # Errors
///
/// Returns an error if the value has no number, an unknown unit or does not
/// fit in a `Duration`
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: u64 = number
        .parse()
        .map_err(|_| anyhow!("expected a number in {value:?}"))?;

    let seconds_per_unit = match unit {
        "ms" => return Ok(Duration::from_millis(number)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => bail!("unknown duration unit {other:?}"),
    };
    let seconds = number
        .checked_mul(seconds_per_unit)
        .ok_or_else(|| anyhow!("duration {value:?} is too large"))?;
    Ok(Duration::from_secs(seconds))
}
