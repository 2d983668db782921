// ============================
// crates/starterkit-lib/src/config.rs
// ============================
//! Configuration management.
use crate::auth::{AuthControllerConfig, MemoryProviderConfig};
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Prefix of environment overrides; nested keys are split on `__`
pub const ENV_PREFIX: &str = "STARTERKIT_";

/// Longest accepted session lifetime: one year
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    pub log_level: String,
    /// Public origin of the application, e.g. `https://app.example.com`
    pub site_url: String,
    /// Route the password reset email links to
    pub reset_redirect_path: String,
    /// Storage bucket for avatar images
    pub avatar_bucket: String,
    /// In-memory provider used by the CLI and tests
    pub memory_provider: MemoryProviderSettings,
}

/// Settings for the in-memory identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryProviderSettings {
    pub require_email_confirmation: bool,
    pub obfuscate_existing_accounts: bool,
    /// Session TTL in seconds
    pub session_ttl_secs: u64,
    pub public_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            site_url: "http://localhost:3000".to_string(),
            reset_redirect_path: "/reset-password".to_string(),
            avatar_bucket: "avatars".to_string(),
            memory_provider: MemoryProviderSettings::default(),
        }
    }
}

impl Default for MemoryProviderSettings {
    fn default() -> Self {
        Self {
            require_email_confirmation: true,
            obfuscate_existing_accounts: false,
            session_ttl_secs: 60 * 60, // 1 hour
            public_base_url: "http://localhost:54321".to_string(),
        }
    }
}

impl Settings {
    /// Load from `starterkit.{toml,json,yaml}` in the working directory,
    /// then `STARTERKIT_*` environment variables
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("starterkit.toml"))
            .merge(Json::file("starterkit.json"))
            .merge(Yaml::file("starterkit.yaml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Load from an explicit TOML file, then `STARTERKIT_*` variables
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_layered(path, ENV_PREFIX)
    }

    /// Load from `path` with overrides from variables starting with `env_prefix`
    pub fn load_layered<P: AsRef<Path>>(path: P, env_prefix: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            bail!("config file {} not found", path.display());
        }
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(env_prefix).split("__"));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the application cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!("invalid log level `{}`", self.log_level);
        }
        match Url::parse(&self.site_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {},
            _ => bail!("site_url must be an absolute http(s) URL, got `{}`", self.site_url),
        }
        if !self.reset_redirect_path.starts_with('/') {
            bail!("reset_redirect_path must start with `/`");
        }
        if self.avatar_bucket.trim().is_empty() {
            bail!("avatar_bucket must not be empty");
        }
        match self.memory_provider.session_ttl_secs {
            0 => bail!("memory_provider.session_ttl_secs must be positive"),
            ttl if ttl > MAX_SESSION_TTL_SECS => bail!(
                "memory_provider.session_ttl_secs must be at most {MAX_SESSION_TTL_SECS}, got {ttl}"
            ),
            _ => {},
        }
        Ok(())
    }

    /// Absolute URL the password reset email links to
    pub fn password_reset_redirect(&self) -> String {
        format!(
            "{}{}",
            self.site_url.trim_end_matches('/'),
            self.reset_redirect_path
        )
    }
}

impl From<&Settings> for AuthControllerConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            password_reset_redirect: settings.password_reset_redirect(),
            avatar_bucket: settings.avatar_bucket.clone(),
        }
    }
}

impl From<&MemoryProviderSettings> for MemoryProviderConfig {
    fn from(settings: &MemoryProviderSettings) -> Self {
        Self {
            require_email_confirmation: settings.require_email_confirmation,
            obfuscate_existing_accounts: settings.obfuscate_existing_accounts,
            // one year always fits in i64 seconds
            session_ttl: chrono::Duration::seconds(
                settings.session_ttl_secs.min(MAX_SESSION_TTL_SECS) as i64,
            ),
            public_base_url: settings.public_base_url.clone(),
        }
    }
}
