//! Client Configuration
//!
//! Centralized configuration loading for the RAG client, with an optional
//! TOML file at `~/.config/rag-chat/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [api]
//! base_url = "https://disney.example.com"
//! api_key = "admin-key"
//! timeout_secs = 30
//!
//! [poller]
//! interval_secs = 30
//!
//! [storage]
//! dir = "/run/user/1000/rag-chat"
//! session_id = "default"
//! ```
//!
//! # Environment Variables
//!
//! - `RAG_API_URL`, `RAG_API_KEY`, `RAG_TIMEOUT_SECS`
//! - `RAG_POLL_INTERVAL_SECS`
//! - `RAG_STORAGE_DIR`, `RAG_SESSION_ID`
//! - `RAG_ENV`: "production", "development" or "test"

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage key of the serialized conversation
pub const HISTORY_KEY: &str = "rag_chat_history";

/// Storage key of the `{showCitations}` preference object
pub const PREFERENCES_KEY: &str = "rag_preferences";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Deployment environment; analytics only leave the process in production
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Real users
    Production,
    /// Local development
    #[default]
    Development,
    /// Automated tests
    Test,
}

impl Environment {
    /// Whether this is a production-like environment
    #[must_use]
    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::ValidationError(format!(
                "unknown environment '{other}'"
            ))),
        }
    }
}

/// Backend connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the site hosting `/api/rag/*`
    pub base_url: String,
    /// Admin API key sent with every request
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ApiConfig {
    /// Configuration pointing at `base_url` with defaults elsewhere
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the admin API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Tier/status poller settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    /// Period between ticks (default: 30 seconds)
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Session storage settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root directory for session files
    pub dir: PathBuf,
    /// Session identifier; one directory per session
    pub session_id: String,
    /// Key of the conversation snapshot
    pub history_key: String,
    /// Key of the preferences object
    pub preferences_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            session_id: "default".to_string(),
            history_key: HISTORY_KEY.to_string(),
            preferences_key: PREFERENCES_KEY.to_string(),
        }
    }
}

/// Complete client configuration
#[derive(Clone, Debug)]
pub struct RagClientConfig {
    /// Backend connection
    pub api: ApiConfig,
    /// Poller timing
    pub poller: PollerConfig,
    /// Session storage
    pub storage: StorageConfig,
    /// Deployment environment
    pub environment: Environment,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    /// Source of configuration values
    source: ConfigSource,
}

impl Default for RagClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            poller: PollerConfig::default(),
            storage: StorageConfig::default(),
            environment: Environment::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl RagClientConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check the configuration for values that cannot work
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a non-HTTP base URL, a
    /// zero poll interval, or an empty session id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }
        if self.poller.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.storage.session_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "session_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// API section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Base URL of the backend
    pub base_url: Option<String>,
    /// Admin API key
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Poller section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerToml {
    /// Poll period in seconds
    pub interval_secs: Option<u64>,
}

/// Storage section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageToml {
    /// Root directory for session files
    pub dir: Option<PathBuf>,
    /// Session identifier
    pub session_id: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagToml {
    /// Deployment environment
    pub environment: Option<Environment>,
    /// API section
    pub api: ApiToml,
    /// Poller section
    pub poller: PollerToml,
    /// Storage section
    pub storage: StorageToml,
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/rag-chat/config.toml` or
/// `~/.config/rag-chat/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rag-chat").join("config.toml"))
}

/// Session-scoped storage root: the user runtime dir when there is one
/// (cleared on logout), otherwise the temp dir
#[must_use]
pub fn default_storage_dir() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rag-chat")
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<RagClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if an environment variable holds an invalid value.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<RagClientConfig, ConfigError> {
    let mut config = RagClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: RagToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut RagClientConfig, toml: &RagToml) {
    if let Some(environment) = toml.environment {
        config.environment = environment;
    }

    if let Some(ref url) = toml.api.base_url {
        config.api.base_url.clone_from(url);
    }
    if toml.api.api_key.is_some() {
        config.api.api_key.clone_from(&toml.api.api_key);
    }
    if let Some(secs) = toml.api.timeout_secs {
        config.api.timeout = Duration::from_secs(secs);
    }

    if let Some(secs) = toml.poller.interval_secs {
        config.poller.interval = Duration::from_secs(secs);
    }

    if let Some(ref dir) = toml.storage.dir {
        config.storage.dir.clone_from(dir);
    }
    if let Some(ref session_id) = toml.storage.session_id {
        config.storage.session_id.clone_from(session_id);
    }
}

/// Apply environment variable overrides; `lookup` abstracts `std::env::var`
fn apply_env_config<F>(config: &mut RagClientConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("RAG_API_URL") {
        config.api.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(key) = lookup("RAG_API_KEY") {
        config.api.api_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = lookup("RAG_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
        config.api.timeout = Duration::from_secs(secs);
        config.source = ConfigSource::Env;
    }
    if let Some(secs) = lookup("RAG_POLL_INTERVAL_SECS").and_then(|v| v.parse::<u64>().ok()) {
        config.poller.interval = Duration::from_secs(secs);
        config.source = ConfigSource::Env;
    }
    if let Some(dir) = lookup("RAG_STORAGE_DIR") {
        config.storage.dir = PathBuf::from(dir);
        config.source = ConfigSource::Env;
    }
    if let Some(session_id) = lookup("RAG_SESSION_ID") {
        config.storage.session_id = session_id;
        config.source = ConfigSource::Env;
    }
    if let Some(env) = lookup("RAG_ENV") {
        config.environment = env.parse()?;
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,
    /// API key override
    pub api_key: Option<String>,
    /// Session id override
    pub session_id: Option<String>,
    /// Storage directory override
    pub storage_dir: Option<PathBuf>,
    /// Environment override
    pub environment: Option<Environment>,
}

impl ConfigOverrides {
    /// Apply overrides to a loaded configuration
    pub fn apply(self, config: &mut RagClientConfig) {
        let mut touched = false;
        if let Some(url) = self.base_url {
            config.api.base_url = url;
            touched = true;
        }
        if let Some(key) = self.api_key {
            config.api.api_key = Some(key);
            touched = true;
        }
        if let Some(session_id) = self.session_id {
            config.storage.session_id = session_id;
            touched = true;
        }
        if let Some(dir) = self.storage_dir {
            config.storage.dir = dir;
            touched = true;
        }
        if let Some(environment) = self.environment {
            config.environment = environment;
            touched = true;
        }
        if touched {
            config.source = ConfigSource::Cli;
        }
    }
}
