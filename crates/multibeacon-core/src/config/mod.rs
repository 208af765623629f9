//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `serde` default functions and `Default` implementations
//! 2. **Config file**: TOML file named by the `MULTIBEACON_CONFIG` env var
//! 3. **Environment variables**: `MULTIBEACON__*` env vars override specific fields
//!
//! # Example
//!
//! ```toml
//! [dispatch]
//! mode = "parallel"
//! max_parallel = 2
//!
//! [[upstreams.providers]]
//! name = "lighthouse"
//! address = "http://localhost:5052"
//! timeout_seconds = 10
//!
//! [[upstreams.providers]]
//! name = "teku"
//! address = "http://localhost:5051"
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, time::Duration};

use crate::upstream::{DispatchConfig, HttpClientConfig};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "MULTIBEACON_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// One upstream beacon node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamProvider {
    /// Unique label used in logs and error reports (e.g., "lighthouse").
    pub name: String,

    /// Base URL of the node's Beacon API. Must start with `http` or `https`.
    pub address: String,

    /// Per-request timeout in seconds. Defaults to `10`.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}

impl UpstreamProvider {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamsConfig {
    /// Nodes in dispatch order. Cannot be empty.
    pub providers: Vec<UpstreamProvider>,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            providers: vec![UpstreamProvider {
                name: "local".to_string(),
                address: "http://localhost:5052".to_string(),
                timeout_seconds: default_timeout_seconds(),
            }],
        }
    }
}

/// Reinstatement of inactive clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Whether inactive clients are probed. Defaults to `true`.
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,

    /// Seconds between probe rounds. Defaults to `30`.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Timeout of one `/eth/v1/node/health` probe in milliseconds. Defaults to `2000`.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_health_enabled() -> bool {
    true
}

fn default_interval_seconds() -> u64 {
    30
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            interval_seconds: default_interval_seconds(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub upstreams: UpstreamsConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Shared HTTP transport settings.
    #[serde(default)]
    pub http: HttpClientConfig,

    #[serde(default)]
    pub health_check: HealthCheckConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `MULTIBEACON__` prefix override any value; nested
    /// fields use `__` (e.g., `MULTIBEACON__DISPATCH__MODE=parallel`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized. A missing
    /// file is not an error.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("dispatch.mode", "sequential")?
            .set_default("dispatch.max_parallel", 3)?
            .set_default("health_check.enabled", true)?
            .set_default("health_check.interval_seconds", 30)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("MULTIBEACON").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml`, or the file named by
    /// `MULTIBEACON_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&config_path)
    }

    #[must_use]
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check.interval_seconds)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check.probe_timeout_ms)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.upstreams.providers.is_empty() {
            return Err("No upstream beacon nodes configured".to_string());
        }

        let mut names = HashSet::new();
        for provider in &self.upstreams.providers {
            if provider.name.is_empty() {
                return Err(format!("Upstream at {} has an empty name", provider.address));
            }
            if !names.insert(provider.name.as_str()) {
                return Err(format!("Duplicate upstream name: {}", provider.name));
            }
            if !provider.address.starts_with("http") {
                return Err(format!(
                    "Invalid address for upstream {}: {}",
                    provider.name, provider.address
                ));
            }
            if provider.timeout_seconds == 0 {
                return Err(format!(
                    "Timeout for upstream {} must be greater than 0",
                    provider.name
                ));
            }
        }

        if self.dispatch.max_parallel == 0 {
            return Err("Dispatch max_parallel must be greater than 0".to_string());
        }

        if self.http.concurrent_limit == 0 {
            return Err("HTTP concurrent_limit must be greater than 0".to_string());
        }

        if self.health_check.enabled {
            if self.health_check.interval_seconds == 0 {
                return Err("Health check interval must be greater than 0".to_string());
            }
            if self.health_check.probe_timeout_ms == 0 {
                return Err("Health check probe timeout must be greater than 0".to_string());
            }
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
