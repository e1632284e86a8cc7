//! Prometheus metrics registry for uptime-probe
//!
//! This module owns every instrument exported on `/metrics`:
//! - `scrape_total{host}`: exposition endpoint accesses
//! - `scrape_bytes_total{target}`: response body bytes read by the prober
//! - `probe_duration_seconds{host,target,status}`: last probe cycle duration
//! - `probe_build_info{version}`: constant 1, identifies the running build
//! - `process_*`: optional process-runtime metrics (Linux only)
//!
//! A `Metrics` value is constructed explicitly and shared by `Arc`/clone.
//! There is no global registry, so every test can start from a fresh one.

use prometheus::{
    Encoder, GaugeVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};
use std::sync::Arc;

pub const SCRAPE_TOTAL: &str = "scrape_total";
pub const SCRAPE_BYTES_TOTAL: &str = "scrape_bytes_total";
pub const PROBE_DURATION_SECONDS: &str = "probe_duration_seconds";
pub const BUILD_INFO: &str = "probe_build_info";

/// Metrics collector for uptime-probe
///
/// All instruments use prometheus atomics internally, so update methods take
/// `&self` and are safe to call from concurrent tasks without extra locking.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    host: String,
    scrape_total: IntCounter,
    scrape_bytes_total: IntCounterVec,
    probe_duration_seconds: GaugeVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all instruments with a new Prometheus registry. `host` is the
    /// fixed label value used for `scrape_total`. When `include_process` is
    /// true, process-runtime metrics are registered as well (no-op outside
    /// Linux).
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    /// Callers must treat this as fatal.
    pub fn new(host: impl Into<String>, include_process: bool) -> Result<Self, prometheus::Error> {
        let host = host.into();
        let registry = Registry::new();

        // Counter: exposition endpoint accesses, one series per host
        let scrape_total_vec = IntCounterVec::new(
            Opts::new(SCRAPE_TOTAL, "Total number of metrics endpoint scrapes"),
            &["host"],
        )?;

        // Counter: bytes of response body read from the probed target
        let scrape_bytes_total = IntCounterVec::new(
            Opts::new(
                SCRAPE_BYTES_TOTAL,
                "Total number of response body bytes read from the probe target",
            ),
            &["target"],
        )?;

        // Gauge: wall-clock duration of the most recent probe request
        //
        // status is the numeric HTTP status, or "" when the request failed
        // before a response arrived.
        let probe_duration_seconds = GaugeVec::new(
            Opts::new(
                PROBE_DURATION_SECONDS,
                "Duration of the last probe request in seconds",
            ),
            &["host", "target", "status"],
        )?;

        let build_info = IntGaugeVec::new(
            Opts::new(BUILD_INFO, "Build information about the running probe"),
            &["version"],
        )?;

        registry.register(Box::new(scrape_total_vec.clone()))?;
        registry.register(Box::new(scrape_bytes_total.clone()))?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;
        registry.register(Box::new(build_info.clone()))?;

        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION")])
            .set(1);

        if include_process {
            register_process_collector(&registry)?;
        }

        // Pre-create the single host series so it is exported as 0 before the
        // first scrape.
        let scrape_total = scrape_total_vec.with_label_values(&[host.as_str()]);

        Ok(Self {
            registry: Arc::new(registry),
            host,
            scrape_total,
            scrape_bytes_total,
            probe_duration_seconds,
        })
    }

    /// Host label captured at construction
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Record one access of the exposition endpoint
    pub fn increment_scrape_count(&self) {
        self.scrape_total.inc();
    }

    /// Add `n` response body bytes for `target`
    ///
    /// Zero is accepted and leaves the counter unchanged.
    pub fn add_scrape_bytes(&self, target: &str, n: u64) {
        self.scrape_bytes_total
            .with_label_values(&[target])
            .inc_by(n);
    }

    /// Overwrite the probe duration gauge for a (host, target, status) tuple
    ///
    /// # Errors
    ///
    /// Returns an error if `seconds` is NaN, infinite, or negative. The gauge
    /// is left untouched in that case.
    pub fn set_probe_duration(
        &self,
        host: &str,
        target: &str,
        status: &str,
        seconds: f64,
    ) -> Result<(), prometheus::Error> {
        if !seconds.is_finite() {
            return Err(prometheus::Error::Msg(format!(
                "Probe duration must be finite (not NaN or Infinity), got: {}",
                seconds
            )));
        }
        if seconds < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Probe duration must be non-negative, got: {}",
                seconds
            )));
        }

        self.probe_duration_seconds
            .get_metric_with_label_values(&[host, target, status])?
            .set(seconds);
        Ok(())
    }

    /// Current value of `scrape_total` for this host
    pub fn scrape_count(&self) -> u64 {
        self.scrape_total.get()
    }

    /// Current value of `scrape_bytes_total{target}`
    ///
    /// Returns 0 for a target that has never been recorded, without creating
    /// the series.
    pub fn scrape_bytes(&self, target: &str) -> u64 {
        self.find_series(SCRAPE_BYTES_TOTAL, &[("target", target)])
            .map(|m| m.counter.value.unwrap_or(0.0) as u64)
            .unwrap_or(0)
    }

    /// Current value of `probe_duration_seconds` for a label tuple, if set
    pub fn probe_duration(&self, host: &str, target: &str, status: &str) -> Option<f64> {
        self.find_series(
            PROBE_DURATION_SECONDS,
            &[("host", host), ("target", target), ("status", status)],
        )
        .map(|m| m.gauge.value.unwrap_or(0.0))
    }

    /// Number of `probe_duration_seconds` series currently exported
    pub fn probe_duration_series_count(&self) -> usize {
        self.family(PROBE_DURATION_SECONDS)
            .map(|mf| mf.get_metric().len())
            .unwrap_or(0)
    }

    fn family(&self, name: &str) -> Option<MetricFamily> {
        self.registry
            .gather()
            .into_iter()
            .find(|mf| mf.name() == name)
    }

    fn find_series(&self, name: &str, labels: &[(&str, &str)]) -> Option<prometheus::proto::Metric> {
        let family = self.family(name)?;
        family
            .get_metric()
            .iter()
            .find(|m| {
                labels.iter().all(|(key, value)| {
                    m.label
                        .iter()
                        .any(|lp| lp.name() == *key && lp.value() == *value)
                })
            })
            .cloned()
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            let metric_names: Vec<_> = metric_families.iter().map(|mf| mf.name()).collect();

            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                metric_names = ?metric_names,
                "Prometheus text encoder failed"
            );

            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_count, e
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            let valid_up_to = e.utf8_error().valid_up_to();
            tracing::error!(
                invalid_byte_index = valid_up_to,
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                valid_up_to, e
            ))
        })
    }
}

#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(
        prometheus::process_collector::ProcessCollector::for_self(),
    ))
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) -> Result<(), prometheus::Error> {
    tracing::warn!("process metrics are only available on Linux; skipping");
    Ok(())
}
