//! Configuration management for uptime-probe
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for `probe.interval_seconds`
pub const MAX_INTERVAL_SECONDS: u64 = 3600;

/// Upper bound for `probe.timeout_seconds`
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub probe: ProbeConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address for `/` and `/metrics`
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

impl ServerConfig {
    /// Parse the configured bind address
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        self.address.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!(
                "server.address '{}' is not a valid socket address: {}",
                self.address, e
            ))
        })
    }
}

fn default_address() -> String {
    "127.0.0.1:8000".to_string()
}

/// Probe target and scheduling configuration
///
/// Fields are private so a validated config cannot be mutated afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    target_url: String,
    #[serde(default = "default_interval")]
    interval_seconds: u64,
    #[serde(default = "default_timeout")]
    timeout_seconds: u64,
    /// Value of the `host` label; falls back to `$HOSTNAME`
    #[serde(default)]
    host: Option<String>,
}

impl ProbeConfig {
    /// Get the URL probed on every tick
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Get the fixed tick interval
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// Get the per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Get the host identity used in metric labels
    ///
    /// Resolution order: `probe.host`, `$HOSTNAME`, `"localhost"`.
    pub fn host(&self) -> String {
        resolve_host(self.host.as_deref(), std::env::var("HOSTNAME").ok())
    }

    /// Whether a single request may outlast the tick interval
    pub fn timeout_exceeds_interval(&self) -> bool {
        self.timeout_seconds > self.interval_seconds
    }
}

/// Pick the host label: explicit value, then the environment, then
/// `"localhost"`. Empty strings count as unset at every step.
fn resolve_host(explicit: Option<&str>, env_hostname: Option<String>) -> String {
    explicit
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .or_else(|| env_hostname.filter(|h| !h.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}

fn default_interval() -> u64 {
    15
}

fn default_timeout() -> u64 {
    10
}

/// Metrics registry configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Register process-runtime metrics (CPU, memory, file descriptors)
    #[serde(default)]
    pub enable_internal_metrics_collector: bool,
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when a
    /// config is built by other means.
    pub fn validate(&self) -> AppResult<()> {
        self.server.socket_addr()?;

        let target = &self.probe.target_url;
        if !target.starts_with("http://") && !target.starts_with("https://") {
            return Err(AppError::Config(format!(
                "probe.target_url '{}' must start with 'http://' or 'https://'",
                target
            )));
        }

        if self.probe.interval_seconds == 0 {
            return Err(AppError::Config(
                "probe.interval_seconds must be greater than 0".to_string(),
            ));
        }
        if self.probe.interval_seconds > MAX_INTERVAL_SECONDS {
            return Err(AppError::Config(format!(
                "probe.interval_seconds cannot exceed {} seconds, got {}",
                MAX_INTERVAL_SECONDS, self.probe.interval_seconds
            )));
        }

        if self.probe.timeout_seconds == 0 {
            return Err(AppError::Config(
                "probe.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.probe.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "probe.timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.probe.timeout_seconds
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
