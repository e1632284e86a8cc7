//! Command-line interface for uptime-probe
//!
//! Provides argument parsing and subcommand handling for the binary.

use clap::{Parser, Subcommand};

/// Periodic HTTP uptime and latency probe
#[derive(Parser)]
#[command(name = "uptime-probe")]
#[command(version)]
#[command(about = "Periodic HTTP uptime and latency probe with Prometheus metrics")]
#[command(
    long_about = "uptime-probe requests a target URL on a fixed interval, records \
    latency, status and response size, and exposes them on /metrics in the \
    Prometheus text format."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# uptime-probe Configuration
# ==========================

# ─────────────────────────────────────────────────────────────────────────────
# SERVER
# ─────────────────────────────────────────────────────────────────────────────

[server]
# Bind address for "/" and "/metrics"
address = "127.0.0.1:8000"

# ─────────────────────────────────────────────────────────────────────────────
# PROBE
# ─────────────────────────────────────────────────────────────────────────────

[probe]
# URL requested with GET on every tick (http:// or https://)
target_url = "https://example.com"

# Seconds between ticks (1-3600). Ticks that fall due while a request is
# still running are skipped.
interval_seconds = 15

# Per-request timeout in seconds (1-300). A timeout is recorded like any
# other transport failure: status="" on probe_duration_seconds.
timeout_seconds = 10

# Value of the "host" label. Defaults to $HOSTNAME, then "localhost".
# host = "probe-1"

# ─────────────────────────────────────────────────────────────────────────────
# METRICS
# ─────────────────────────────────────────────────────────────────────────────

[metrics]
# Export process_* metrics (CPU, memory, file descriptors). Linux only.
enable_internal_metrics_collector = false

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG overrides)
log_level = "info"
"#
}
