//! HTTP request handlers for uptime-probe

use crate::metrics::Metrics;
use std::sync::Arc;

pub mod metrics;
pub mod root;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState around an existing metrics registry
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Get reference to the metrics registry
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
