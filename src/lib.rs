//! uptime-probe - periodic HTTP uptime and latency probe
//!
//! Issues an HTTP GET against a configured target on a fixed interval and
//! exports latency, status and response size as Prometheus metrics on
//! `/metrics`.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod prober;
pub mod server;
pub mod telemetry;
