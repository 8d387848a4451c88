use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the configured per-source deadline.
    pub fn init(scrape_timeout_ms: u64) -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("scrape_timeout_ms").set(scrape_timeout_ms as f64);

        Ok(Self { handle })
    }

    /// `/metrics`: the `scrape_*` series recorded by each refresh cycle
    /// (runs, per-source success/failure counts, durations) plus
    /// `scrape_timeout_ms`.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
    }
}
