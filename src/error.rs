//! Error types for uptime-probe
//!
//! Fatal startup and shutdown failures are represented here. Recoverable probe
//! failures never become an `AppError`; they are logged by the prober and only
//! surface through the exported metrics.

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Failed to register metrics: {0}")]
    MetricsRegistration(#[from] prometheus::Error),

    #[error("Failed to build probe HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server did not shut down within {grace_seconds} seconds")]
    ShutdownTimeout { grace_seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
