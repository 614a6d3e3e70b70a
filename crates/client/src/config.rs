//! Configuration management for the file exchange client.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/file-exchange/config.toml`.
//! Endpoint URLs can also be supplied through the environment, which is how
//! most deployments provide them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ExchangeError, ExchangeResult};

/// Environment variable holding the unpack/list endpoint URL.
pub const UNPACK_URL_ENV: &str = "SUPA_UNPACK_API_URL";

/// Environment variable holding the main/download endpoint URL.
pub const MAIN_URL_ENV: &str = "SUPA_MAIN_API_URL";

/// Default environment variable holding the bearer token.
pub const DEFAULT_TOKEN_ENV: &str = "SUPA_AUTH_TOKEN";

/// Environment variable overriding the log level.
pub const LOG_LEVEL_ENV: &str = "FILE_EXCHANGE_LOG_LEVEL";

/// Upper bound for any request timeout, in seconds.
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} is not a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field} must use http:// or https://, got {value}")]
    UnsupportedScheme { field: &'static str, value: String },

    #[error("{field} must be between 1 and 3600 seconds, got {value}")]
    InvalidTimeout { field: &'static str, value: u64 },

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Main configuration structure for the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Remote endpoint URLs.
    pub endpoints: EndpointsConfig,

    /// Where the bearer token comes from.
    pub auth: AuthConfig,

    /// Per-request timeouts.
    pub http: HttpConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Remote endpoint URLs as written in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Unpack endpoint, used for submit and list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpack_url: Option<String>,

    /// Main endpoint, used for download.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_url: Option<String>,
}

/// Source of the bearer token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// Read an environment variable on every request.
    #[default]
    Env,
    /// Read the OS keychain on every request.
    Keyring,
}

/// Credential lookup settings. The token itself is never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub source: CredentialSource,

    /// Variable consulted when `source = "env"`.
    pub token_env: String,

    /// Keychain service consulted when `source = "keyring"`.
    pub keyring_service: String,

    /// Keychain entry name consulted when `source = "keyring"`.
    pub keyring_user: String,
}

/// HTTP request settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout for uploads, in seconds.
    pub submit_timeout_secs: u64,

    /// Timeout for listing requests, in seconds.
    pub list_timeout_secs: u64,

    /// Timeout for downloads, in seconds. Payloads may be large.
    pub download_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,

    /// Optional file receiving a copy of the log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            source: CredentialSource::Env,
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            keyring_service: "file-exchange".to_string(),
            keyring_user: "bearer_token".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            submit_timeout_secs: 30,
            list_timeout_secs: 30,
            download_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl HttpConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("file-exchange")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - SUPA_UNPACK_API_URL: Override the unpack endpoint
    /// - SUPA_MAIN_API_URL: Override the main endpoint
    /// - FILE_EXCHANGE_LOG_LEVEL: Override log level
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(UNPACK_URL_ENV) {
            tracing::debug!("Overriding unpack_url from environment");
            self.endpoints.unpack_url = Some(url);
        }

        if let Some(url) = non_empty_env(MAIN_URL_ENV) {
            tracing::debug!("Overriding main_url from environment");
            self.endpoints.main_url = Some(url);
        }

        if let Some(level) = non_empty_env(LOG_LEVEL_ENV) {
            tracing::debug!("Overriding log level from environment: {}", level);
            self.logging.level = level;
        }
    }

    /// Validate the configuration values.
    ///
    /// Absent endpoints are not an error here; see [`EndpointConfig::missing`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.endpoints.unpack_url {
            parse_endpoint("unpack_url", url)?;
        }
        if let Some(url) = &self.endpoints.main_url {
            parse_endpoint("main_url", url)?;
        }

        for (field, value) in [
            ("submit_timeout_secs", self.http.submit_timeout_secs),
            ("list_timeout_secs", self.http.list_timeout_secs),
            ("download_timeout_secs", self.http.download_timeout_secs),
        ] {
            if value == 0 || value > MAX_TIMEOUT_SECS {
                return Err(ConfigError::InvalidTimeout { field, value });
            }
        }

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_endpoint(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme {
            field,
            value: value.to_string(),
        }),
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

/// The two resolved endpoint URLs, fixed for the life of the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EndpointConfig {
    unpack: Option<Url>,
    main: Option<Url>,
}

impl EndpointConfig {
    pub fn new(unpack: Option<Url>, main: Option<Url>) -> Self {
        Self { unpack, main }
    }

    /// Resolve the endpoints of a loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let unpack = config
            .endpoints
            .unpack_url
            .as_deref()
            .map(|u| parse_endpoint("unpack_url", u))
            .transpose()?;
        let main = config
            .endpoints
            .main_url
            .as_deref()
            .map(|u| parse_endpoint("main_url", u))
            .transpose()?;
        Ok(Self { unpack, main })
    }

    /// Unpack endpoint, or `ConfigurationMissing`.
    pub fn unpack_url(&self) -> ExchangeResult<&Url> {
        self.unpack.as_ref().ok_or_else(|| {
            ExchangeError::ConfigurationMissing(format!("{} is not set", UNPACK_URL_ENV))
        })
    }

    /// Main endpoint, or `ConfigurationMissing`.
    pub fn main_url(&self) -> ExchangeResult<&Url> {
        self.main.as_ref().ok_or_else(|| {
            ExchangeError::ConfigurationMissing(format!("{} is not set", MAIN_URL_ENV))
        })
    }

    /// Names of the variables whose endpoints are absent.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.unpack.is_none() {
            missing.push(UNPACK_URL_ENV);
        }
        if self.main.is_none() {
            missing.push(MAIN_URL_ENV);
        }
        missing
    }
}
