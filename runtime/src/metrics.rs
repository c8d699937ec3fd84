//! Prometheus metrics for call orchestration.
//!
//! The orchestrator records through the `metrics` facade, so nothing is
//! exported unless a recorder is installed. [`MetricsServer`] installs the
//! Prometheus recorder and renders the exposition text.
//!
//! Recorded series:
//! - `relaykit_dispatches_total{endpoint}`: transport invocations
//! - `relaykit_retries_total{endpoint, reason}`: retries after a timeout or a
//!   retryable status
//! - `relaykit_calls_total{outcome}`: terminal outcomes (`ok` or error kind)
//! - `relaykit_call_duration_seconds{outcome}`: wall time per call
//!
//! # Example
//!
//! ```rust,no_run
//! use relaykit_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // ... run calls ...
//!
//! if let Some(text) = server.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use relaykit_core::CallResult;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Owns the recorder handle used to render the exposition text. The address
/// is where the embedding application serves that text.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the exposition is meant to be served on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g. by an earlier test), this
    /// logs a warning and returns `Ok` without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!(
        "relaykit_dispatches_total",
        "Total number of transport invocations"
    );
    describe_counter!(
        "relaykit_retries_total",
        "Total number of retries, labeled by reason (timeout or status)"
    );
    describe_counter!(
        "relaykit_calls_total",
        "Total number of completed calls, labeled by outcome"
    );
    describe_histogram!(
        "relaykit_call_duration_seconds",
        "Wall time of a call from resolution to terminal outcome"
    );
}

/// Why a dispatch is being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The transport reported a timeout
    Timeout,
    /// The response status is configured as retryable
    Status,
}

impl RetryReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Status => "status",
        }
    }
}

/// Call metrics recorder.
pub struct CallMetrics;

impl CallMetrics {
    /// Record one transport invocation.
    pub fn record_dispatch(endpoint: &str) {
        counter!("relaykit_dispatches_total", "endpoint" => endpoint.to_string()).increment(1);
    }

    /// Record a retry.
    pub fn record_retry(endpoint: &str, reason: RetryReason) {
        counter!(
            "relaykit_retries_total",
            "endpoint" => endpoint.to_string(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    /// Record a terminal outcome and the call's duration.
    pub fn record_outcome(result: &CallResult, duration: Duration) {
        let outcome = result.error.map_or("ok", |error| error.kind());
        counter!("relaykit_calls_total", "outcome" => outcome).increment(1);
        histogram!("relaykit_call_duration_seconds", "outcome" => outcome)
            .record(duration.as_secs_f64());
    }
}
