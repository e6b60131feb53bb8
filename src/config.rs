//! Agent configuration.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Ingest API settings (service, metric prefix, key, base URL)
//! - Dispatch behavior (dry run, request timeout)
//! - Metric sources (mock, system, warehouse queries)
//!
//! Secret and URL fields support `${VAR}` and `${VAR:-default}`
//! environment variable expansion.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::DEFAULT_API_BASE;
use crate::source::{MockConfig, QueryConfig, SystemConfig};

// =============================================================================
// Constants
// =============================================================================

/// Default ingest request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

// =============================================================================
// Source Configurations
// =============================================================================

/// Metric source configurations grouped by kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Fixed-sample mock source, for wiring checks.
    pub mock: MockConfig,

    /// Host load, memory and uptime source.
    pub system: SystemConfig,

    /// Warehouse query sources.
    pub query: Vec<QueryConfig>,
}

// =============================================================================
// Agent Configuration
// =============================================================================

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Service name metrics are posted under.
    pub service: String,

    /// Prefix joined onto every sample label on the wire.
    pub metric_prefix: String,

    /// Ingest API key.
    pub api_key: String,

    /// Ingest API base URL (default: hosted endpoint).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Ingest request timeout (default: 30s).
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Log batches without posting them (default: false).
    #[serde(default)]
    pub dry_run: bool,

    /// Metric sources to process.
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl AgentConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.expand_env();
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in secret and URL fields.
    fn expand_env(&mut self) {
        self.api_key = expand_env_vars(&self.api_key);
        self.api_base = expand_env_vars(&self.api_base);
        for query in &mut self.sources.query {
            query.database_url = expand_env_vars(&query.database_url);
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.is_empty() {
            return Err(ConfigError::ValidationError(
                "service must not be empty".to_string(),
            ));
        }

        if self.metric_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "metric_prefix must not be empty".to_string(),
            ));
        }

        // A dry run never posts, so the key may stay empty there.
        if self.api_key.is_empty() && !self.dry_run {
            return Err(ConfigError::ValidationError(
                "api_key must not be empty outside of dry run".to_string(),
            ));
        }

        reqwest::Url::parse(&self.api_base).map_err(|_| {
            ConfigError::ValidationError(format!("invalid api_base URL: '{}'", self.api_base))
        })?;

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request_timeout must be positive".to_string(),
            ));
        }

        // Check for duplicate query source names
        let mut seen_names = HashSet::new();
        for query in &self.sources.query {
            if query.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "query source name cannot be empty".to_string(),
                ));
            }
            if query.database_url.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "query source '{}': database_url cannot be empty",
                    query.name
                )));
            }
            if query.query.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "query source '{}': query cannot be empty",
                    query.name
                )));
            }
            if !seen_names.insert(&query.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate query source name: '{}'",
                    query.name
                )));
            }
        }

        Ok(())
    }
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}
