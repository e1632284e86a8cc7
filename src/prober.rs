//! Probe scheduling for the configured target
//!
//! A `Prober` issues one HTTP GET per tick, measures it, and writes the result
//! to the shared [`Metrics`]. Cycles are awaited inside the scheduling loop, so
//! at most one request is outstanding at any time; ticks that fall due while
//! a slow cycle is still running are skipped rather than queued.
//!
//! Cancellation is cooperative. A stop notification is observed between
//! cycles and never aborts an in-flight request.

use crate::config::ProbeConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runtime settings for a prober
#[derive(Debug, Clone)]
pub struct ProberSettings {
    /// URL requested on every tick
    pub target_url: String,
    /// Value of the `host` label on duration series
    pub host: String,
    /// Fixed tick interval
    pub interval: Duration,
    /// Upper bound for a single request, including the body read
    pub timeout: Duration,
}

impl ProberSettings {
    pub fn from_config(probe: &ProbeConfig) -> Self {
        Self {
            target_url: probe.target_url().to_string(),
            host: probe.host(),
            interval: probe.interval(),
            timeout: probe.timeout(),
        }
    }
}

/// Result of a single probe cycle
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// The request could not be built; nothing was measured
    Skipped { reason: String },
    /// The request failed before a response arrived (connect, DNS, timeout)
    TransportFailed { elapsed: Duration, reason: String },
    /// A response arrived. `body_bytes` is `None` when the body read failed.
    Completed {
        status: StatusCode,
        elapsed: Duration,
        body_bytes: Option<u64>,
    },
}

impl ProbeOutcome {
    /// The `status` label recorded for this cycle, if a duration was recorded
    pub fn status_label(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Skipped { .. } => None,
            ProbeOutcome::TransportFailed { .. } => Some(""),
            ProbeOutcome::Completed { status, .. } => Some(status.as_str()),
        }
    }

    /// Elapsed request time, if the request was dispatched
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            ProbeOutcome::Skipped { .. } => None,
            ProbeOutcome::TransportFailed { elapsed, .. }
            | ProbeOutcome::Completed { elapsed, .. } => Some(*elapsed),
        }
    }
}

/// Read the body chunk by chunk and return its length
///
/// Chunks are dropped as soon as they are counted, so memory use does not
/// grow with the size of the response.
async fn drain_body(response: &mut reqwest::Response) -> reqwest::Result<u64> {
    let mut total = 0u64;
    while let Some(chunk) = response.chunk().await? {
        total += chunk.len() as u64;
    }
    Ok(total)
}

/// Periodic HTTP prober for a single target
pub struct Prober {
    client: reqwest::Client,
    settings: ProberSettings,
    metrics: Arc<Metrics>,
}

impl Prober {
    /// Create a prober with a client bounded by `settings.timeout`
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for a zero interval, or
    /// `AppError::HttpClient` if the HTTP client cannot be built (e.g., TLS
    /// backend initialisation failure).
    pub fn new(settings: ProberSettings, metrics: Arc<Metrics>) -> AppResult<Self> {
        if settings.interval.is_zero() {
            return Err(AppError::Config(
                "probe interval must be greater than 0".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            settings,
            metrics,
        })
    }

    /// Run one probe cycle and record its measurements
    ///
    /// Never fails: every error is logged and reflected in the returned
    /// outcome and in the metrics.
    pub async fn probe_once(&self) -> ProbeOutcome {
        let target = self.settings.target_url.as_str();
        let host = self.settings.host.as_str();

        let request = match self.client.get(target).build() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    target_url = %target,
                    error = %e,
                    "Failed to build probe request, skipping cycle"
                );
                return ProbeOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let start = Instant::now();
        let mut response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let elapsed = start.elapsed();
                self.record_duration(host, target, "", elapsed);
                tracing::warn!(
                    target_url = %target,
                    elapsed_ms = elapsed.as_millis() as u64,
                    timeout = e.is_timeout(),
                    error = %e,
                    "Probe request failed"
                );
                return ProbeOutcome::TransportFailed {
                    elapsed,
                    reason: e.to_string(),
                };
            }
        };

        let elapsed = start.elapsed();
        let status = response.status();
        self.record_duration(host, target, status.as_str(), elapsed);

        let body_bytes = match drain_body(&mut response).await {
            Ok(len) => {
                self.metrics.add_scrape_bytes(target, len);
                Some(len)
            }
            Err(e) => {
                tracing::warn!(
                    target_url = %target,
                    status = %status,
                    error = %e,
                    "Failed to read probe response body"
                );
                None
            }
        };

        tracing::debug!(
            target_url = %target,
            status = %status,
            elapsed_ms = elapsed.as_millis() as u64,
            body_bytes = ?body_bytes,
            "Probe cycle completed"
        );

        ProbeOutcome::Completed {
            status,
            elapsed,
            body_bytes,
        }
    }

    fn record_duration(&self, host: &str, target: &str, status: &str, elapsed: Duration) {
        if let Err(e) =
            self.metrics
                .set_probe_duration(host, target, status, elapsed.as_secs_f64())
        {
            tracing::error!(
                target_url = %target,
                status = %status,
                error = %e,
                "Failed to record probe duration"
            );
        }
    }

    /// Run the scheduling loop until a stop notification is observed
    ///
    /// The first tick fires immediately. The loop exits when `stop` carries
    /// `true` or its sender is dropped. Returns the number of cycles run.
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> u64 {
        tracing::info!(
            target_url = %self.settings.target_url,
            interval_ms = self.settings.interval.as_millis() as u64,
            timeout_ms = self.settings.timeout.as_millis() as u64,
            "Starting prober"
        );

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = 0u64;

        loop {
            let stopped = *stop.borrow_and_update();
            if stopped {
                break;
            }

            tokio::select! {
                biased;

                changed = stop.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Prober stop channel closed");
                        break;
                    }
                    // Value is re-checked at the top of the loop
                }
                _ = ticker.tick() => {
                    self.probe_once().await;
                    cycles += 1;
                }
            }
        }

        tracing::info!(cycles, "Prober stopped");
        cycles
    }

    /// Spawn the scheduling loop onto the tokio runtime
    pub fn spawn(self) -> ProberHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        ProberHandle { stop_tx, task }
    }
}

/// Handle to a running prober task
pub struct ProberHandle {
    pub(crate) stop_tx: watch::Sender<bool>,
    pub(crate) task: JoinHandle<u64>,
}

impl ProberHandle {
    /// Request a stop and wait until the loop has exited
    ///
    /// An in-flight cycle finishes first. Returns the number of cycles run.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the prober task panicked.
    pub async fn stop(self) -> AppResult<u64> {
        // The receiver only disappears once the task has exited, which the
        // join below reports on.
        let _ = self.stop_tx.send(true);
        self.task
            .await
            .map_err(|e| AppError::Internal(format!("prober task failed: {}", e)))
    }

    /// Whether the prober task has already exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(target: &str) -> ProberSettings {
        ProberSettings {
            target_url: target.to_string(),
            host: "unit-host".to_string(),
            interval: Duration::from_millis(50),
            timeout: Duration::from_secs(1),
        }
    }

    fn metrics() -> Arc<Metrics> {
        Arc::new(Metrics::new("unit-host", false).expect("metrics should build"))
    }

    #[tokio::test]
    async fn test_malformed_url_skips_cycle_without_recording() {
        let metrics = metrics();
        let prober = Prober::new(settings("http://[::1"), metrics.clone()).unwrap();

        let outcome = prober.probe_once().await;

        assert!(matches!(outcome, ProbeOutcome::Skipped { .. }));
        assert_eq!(outcome.status_label(), None);
        assert_eq!(metrics.probe_duration_series_count(), 0);
    }

    #[tokio::test]
    async fn test_connection_refused_records_empty_status() {
        // Bind then drop to get a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let target = format!("http://{}/", addr);
        let metrics = metrics();
        let prober = Prober::new(settings(&target), metrics.clone()).unwrap();

        let outcome = prober.probe_once().await;

        assert!(matches!(outcome, ProbeOutcome::TransportFailed { .. }));
        assert_eq!(outcome.status_label(), Some(""));
        let recorded = metrics
            .probe_duration("unit-host", &target, "")
            .expect("duration should be recorded on transport failure");
        assert!(recorded >= 0.0);
        assert_eq!(metrics.scrape_bytes(&target), 0);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick_runs_no_cycles() {
        let prober = Prober::new(settings("http://[::1"), metrics()).unwrap();
        let (tx, rx) = watch::channel(true);

        let cycles = prober.run(rx).await;

        assert_eq!(cycles, 0);
        drop(tx);
    }

    #[tokio::test]
    async fn test_dropped_stop_sender_ends_loop() {
        let prober = Prober::new(settings("http://[::1"), metrics()).unwrap();
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let cycles = tokio::time::timeout(Duration::from_secs(1), prober.run(rx))
            .await
            .expect("loop should exit when the sender is dropped");
        assert!(cycles <= 1);
    }

    #[tokio::test]
    async fn test_handle_stop_returns_cycle_count() {
        let prober = Prober::new(settings("http://[::1"), metrics()).unwrap();
        let handle = prober.spawn();

        tokio::time::sleep(Duration::from_millis(180)).await;
        let cycles = handle.stop().await.expect("prober should stop cleanly");

        // Ticks at 0, 50, 100, 150 ms
        assert!(cycles >= 2, "expected several cycles, got {}", cycles);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut zero = settings("http://example.com");
        zero.interval = Duration::ZERO;
        assert!(matches!(
            Prober::new(zero, metrics()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_outcome_accessors() {
        let completed = ProbeOutcome::Completed {
            status: StatusCode::OK,
            elapsed: Duration::from_millis(5),
            body_bytes: Some(3),
        };
        assert_eq!(completed.status_label(), Some("200"));
        assert_eq!(completed.elapsed(), Some(Duration::from_millis(5)));

        let skipped = ProbeOutcome::Skipped {
            reason: "bad url".to_string(),
        };
        assert_eq!(skipped.elapsed(), None);
    }
}
