//! Prometheus metrics endpoint
//!
//! Exposes metrics in Prometheus text format for scraping.

use axum::{
    extract::State,
    http::{StatusCode, header},
};

use crate::handlers::AppState;

/// Metrics handler for Prometheus scraping
///
/// Counts the scrape in `scrape_total{host}` first, so the returned snapshot
/// already includes this access.
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics encoding fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:8000/metrics
/// # HELP scrape_total Total number of metrics endpoint scrapes
/// # TYPE scrape_total counter
/// scrape_total{host="probe-1"} 1
/// ```
pub async fn handler(
    State(state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let metrics = state.metrics();
    metrics.increment_scrape_count();

    match metrics.gather() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            output,
        ),
        Err(e) => {
            tracing::error!(
                error = %e,
                "Failed to gather metrics for Prometheus scraping"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                format!("Failed to gather metrics: {}", e),
            )
        }
    }
}
