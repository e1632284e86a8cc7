//! Placeholder response on `/`

/// Fixed body returned on the root path
pub const PLACEHOLDER_BODY: &str = "Bazinga!!!";

/// Root handler
///
/// Always returns `200 OK` with [`PLACEHOLDER_BODY`]. Does not touch metrics.
pub async fn handler() -> &'static str {
    tracing::debug!(bytes = PLACEHOLDER_BODY.len(), "Serving placeholder response");
    PLACEHOLDER_BODY
}
