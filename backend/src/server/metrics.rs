//! Optional Prometheus metrics middleware.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use color_eyre::eyre::{Result, eyre};

/// Build the metrics middleware, serving `/metrics`.
///
/// # Errors
/// Fails when the default collectors cannot be registered.
pub(crate) fn make_metrics() -> Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new("tracker")
        .endpoint("/metrics")
        .build()
        .map_err(|err| eyre!("failed to configure Prometheus metrics: {err}"))
}
