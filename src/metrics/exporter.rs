//! Prometheus metrics exporter
//!
//! Serves the recorded counters and gauges over HTTP for scraping.

use crate::metrics::recorder::init_metrics;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

static EXPORTER_STARTED: AtomicBool = AtomicBool::new(false);

/// Errors that can occur during metrics setup
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to setup metrics: {0}")]
    SetupFailed(String),

    #[error("Metrics already initialized")]
    AlreadyInitialized,
}

/// Install the Prometheus recorder and serve `/metrics` on `listen_addr`.
///
/// Must be called from within a Tokio runtime, at most once per process.
pub fn start_metrics_exporter(listen_addr: SocketAddr) -> Result<(), MetricsError> {
    if EXPORTER_STARTED.swap(true, Ordering::SeqCst) {
        return Err(MetricsError::AlreadyInitialized);
    }

    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
        .map_err(|e| {
            EXPORTER_STARTED.store(false, Ordering::SeqCst);
            MetricsError::SetupFailed(e.to_string())
        })?;

    init_metrics();
    tracing::info!(%listen_addr, "metrics exporter listening");
    Ok(())
}
