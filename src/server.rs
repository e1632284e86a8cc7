//! HTTP surface and process lifecycle
//!
//! Shutdown runs in a fixed order: the prober is told to stop and joined
//! first, and only then is the HTTP server asked to drain, bounded by a grace
//! period. The listener therefore stays open for the whole time the prober
//! may still be writing metrics.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::{self, AppState};
use crate::metrics::Metrics;
use crate::prober::{Prober, ProberHandle, ProberSettings};
use axum::{Router, routing::get};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

/// Time the server gets to finish in-flight responses after the prober stops
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Steps of the shutdown sequence, reported in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    SignalReceived,
    ProberStopped,
    ServerDraining,
    ServerStopped,
}

/// Build the router serving `/` and `/metrics`
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root::handler))
        .route("/metrics", get(handlers::metrics::handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind the HTTP listener
pub async fn bind(address: &str) -> AppResult<TcpListener> {
    TcpListener::bind(address)
        .await
        .map_err(|source| AppError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Resolve when SIGINT or SIGTERM is received
///
/// If a handler cannot be installed the error is logged and that signal is
/// ignored; the other one still triggers shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Signal received, starting graceful shutdown");
}

/// Serve `app` until `signal` resolves, then run the shutdown sequence
///
/// `observer` is called once per [`ShutdownPhase`] in order. The server only
/// starts draining after `prober` has confirmed it exited.
///
/// # Errors
///
/// - `AppError::ShutdownTimeout` if the server is still busy after `grace`
/// - `AppError::Internal` if the prober or server task failed. A prober
///   failure is reported only after the server has drained.
pub async fn run_until_shutdown<S, F>(
    listener: TcpListener,
    app: Router,
    prober: ProberHandle,
    signal: S,
    grace: Duration,
    mut observer: F,
) -> AppResult<()>
where
    S: Future<Output = ()>,
    F: FnMut(ShutdownPhase),
{
    let (drain_tx, drain_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                // A dropped sender also means "drain now"
                let _ = drain_rx.await;
            })
            .await
    });

    signal.await;
    observer(ShutdownPhase::SignalReceived);

    // A failed prober still lets the server drain; the error is returned last
    let prober_result = match prober.stop().await {
        Ok(cycles) => {
            tracing::info!(cycles, "Prober confirmed stop");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Prober did not stop cleanly");
            Err(e)
        }
    };
    observer(ShutdownPhase::ProberStopped);

    let _ = drain_tx.send(());
    observer(ShutdownPhase::ServerDraining);

    match tokio::time::timeout(grace, server).await {
        Ok(Ok(Ok(()))) => {
            observer(ShutdownPhase::ServerStopped);
            prober_result
        }
        Ok(Ok(Err(e))) => Err(AppError::Internal(format!("HTTP server failed: {}", e))),
        Ok(Err(e)) => Err(AppError::Internal(format!("HTTP server task failed: {}", e))),
        Err(_) => Err(AppError::ShutdownTimeout {
            grace_seconds: grace.as_secs(),
        }),
    }
}

/// Start the probe and HTTP surface from `config` and block until shutdown
pub async fn run(config: Config) -> AppResult<()> {
    if config.probe.timeout_exceeds_interval() {
        tracing::warn!(
            timeout_seconds = config.probe.timeout().as_secs(),
            interval_seconds = config.probe.interval().as_secs(),
            "probe timeout exceeds interval; slow cycles will cause skipped ticks"
        );
    }

    let settings = ProberSettings::from_config(&config.probe);
    let metrics = Arc::new(Metrics::new(
        settings.host.clone(),
        config.metrics.enable_internal_metrics_collector,
    )?);

    let listener = bind(&config.server.address).await?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| AppError::Internal(format!("listener has no local address: {}", e)))?;

    let prober = Prober::new(settings, metrics.clone())?.spawn();
    let app = build_router(AppState::new(metrics));

    tracing::info!("Listening on {}", local_addr);
    tracing::info!("Metrics available at http://{}/metrics", local_addr);

    run_until_shutdown(
        listener,
        app,
        prober,
        shutdown_signal(),
        SHUTDOWN_GRACE,
        |phase| tracing::info!(?phase, "Shutdown progress"),
    )
    .await
}
