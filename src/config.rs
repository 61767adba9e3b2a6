use crate::retry::{MessageClassifier, ThrottleConfig, DEFAULT_MAX_RETRIES, RATE_LIMIT_EXCEEDED};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, error};

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";

pub const API_KEY_VAR: &str = "TWITTER_API_KEY";
pub const API_SECRET_VAR: &str = "TWITTER_API_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "TWITTER_ACCESS_TOKEN";
pub const ACCESS_SECRET_VAR: &str = "TWITTER_ACCESS_SECRET";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_secs: u64,
    pub throttle_message: String,
    pub max_jitter_ms: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_secs: 5,
            throttle_message: RATE_LIMIT_EXCEEDED.to_string(),
            max_jitter_ms: None,
        }
    }
}

impl RetrySettings {
    pub fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig {
            max_retries: self.max_retries,
            base_delay: std::time::Duration::from_secs(self.base_delay_secs),
            max_jitter: self.max_jitter_ms.map(std::time::Duration::from_millis),
        }
    }

    pub fn classifier(&self) -> MessageClassifier {
        MessageClassifier::new(self.throttle_message.clone())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TwitterConfig {
    pub api_base: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub retry: RetrySettings,
    pub twitter: TwitterConfig,
}

impl Config {
    /// Reads `config.toml` from the working directory, falling back to
    /// defaults when the file does not exist.
    pub fn new() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            debug!("No {} found; using default config", CONFIG_FILE);
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)?;
        debug!("Config: {:?}", config);
        Ok(config)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TwitterCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

impl TwitterCredentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Collects all four credentials through `lookup`, reporting every
    /// missing variable rather than stopping at the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut get = |name: &'static str| match lookup(name).filter(|v| !v.is_empty()) {
            Some(value) => value,
            None => {
                error!("Please export the '{}' environment variable.", name);
                missing.push(name);
                String::new()
            }
        };

        let credentials = Self {
            api_key: get(API_KEY_VAR),
            api_secret: get(API_SECRET_VAR),
            access_token: get(ACCESS_TOKEN_VAR),
            access_secret: get(ACCESS_SECRET_VAR),
        };

        if !missing.is_empty() {
            anyhow::bail!("incomplete credentials: missing {}", missing.join(", "));
        }
        Ok(credentials)
    }
}
