//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Default Supabase URL (can be overridden at compile time via SUPABASE_URL env var).
pub const DEFAULT_SUPABASE_URL: &str = match option_env!("SUPABASE_URL") {
    Some(url) => url,
    None => "https://random.supabase.co",
};

/// Default Supabase anon key (can be overridden at compile time via SUPABASE_ANON_KEY env var).
pub const DEFAULT_SUPABASE_ANON_KEY: &str = match option_env!("SUPABASE_ANON_KEY") {
    Some(key) => key,
    None => "random-key",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const ENV_LOG_LEVEL: &str = "COMMUNITY_FEED_LOG_LEVEL";
const ENV_SUPABASE_URL: &str = "COMMUNITY_FEED_SUPABASE_URL";
const ENV_SUPABASE_ANON_KEY: &str = "COMMUNITY_FEED_SUPABASE_ANON_KEY";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Supabase project URL.
    #[serde(default = "default_supabase_url")]
    pub supabase_url: String,
    /// Supabase anon API key (public, safe to expose).
    #[serde(default = "default_supabase_anon_key")]
    pub supabase_anon_key: String,
    /// Profile provisioning timings used after sign-up.
    #[serde(default)]
    pub provisioning: ProvisioningSettings,
    /// Feed paging and caching.
    #[serde(default)]
    pub feed: FeedSettings,
}

/// Timings for the post-sign-up profile provisioning poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningSettings {
    /// Wait before the first profile lookup.
    pub grace_period_ms: u64,
    /// Number of profile lookups before falling back to a direct insert.
    pub max_attempts: u32,
    /// Wait after each lookup that finds nothing.
    pub backoff_ms: u64,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            grace_period_ms: 1_000,
            max_attempts: 5,
            backoff_ms: 500,
        }
    }
}

/// Feed paging and cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Posts per page.
    pub page_size: u32,
    /// How long cached query results stay fresh.
    pub cache_ttl_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 10,
            cache_ttl_secs: 60,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_supabase_url() -> String {
    DEFAULT_SUPABASE_URL.to_string()
}

fn default_supabase_anon_key() -> String {
    DEFAULT_SUPABASE_ANON_KEY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            supabase_url: default_supabase_url(),
            supabase_anon_key: default_supabase_anon_key(),
            provisioning: ProvisioningSettings::default(),
            feed: FeedSettings::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file (if any), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from `COMMUNITY_FEED_*` environment variables.
    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(log_level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = log_level;
        }
        if let Some(url) = lookup(ENV_SUPABASE_URL) {
            self.supabase_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup(ENV_SUPABASE_ANON_KEY) {
            self.supabase_anon_key = key;
        }
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        self.supabase_url()?;
        if self.supabase_anon_key.trim().is_empty() {
            return Err(CoreError::Config("supabase_anon_key is empty".to_string()));
        }
        if self.provisioning.max_attempts == 0 {
            return Err(CoreError::Config(
                "provisioning.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.feed.page_size == 0 {
            return Err(CoreError::Config("feed.page_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Get the Supabase URL as a parsed URL.
    pub fn supabase_url(&self) -> CoreResult<Url> {
        Url::parse(&self.supabase_url).map_err(CoreError::from)
    }
}
