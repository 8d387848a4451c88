//! Rate aggregator — binary entrypoint.
//! Boots the Axum HTTP server: config → store → browser launcher → engine → routes.

use std::sync::Arc;

use rate_aggregator::api::{self, AppState};
use rate_aggregator::config::RatesConfig;
use rate_aggregator::metrics::Metrics;
use rate_aggregator::renderer::chromium::ChromiumLauncher;
use rate_aggregator::store::SqliteRateStore;
use rate_aggregator::RateEngine;
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    rate_aggregator::init_tracing();

    let cfg = RatesConfig::load_default()?;
    tracing::info!(store = %cfg.store.path, "configuration loaded");

    // Built once here, reused by every refresh cycle, dropped with the router.
    let store = SqliteRateStore::open(&cfg.store.path)?;
    let launcher = ChromiumLauncher::new(cfg.browser.chromium_path.clone(), cfg.navigation_timeout());
    let engine = RateEngine::from_config(&cfg, Arc::new(store), Arc::new(launcher));
    tracing::info!(sources = ?engine.sources(), "rate engine ready");

    let mut router = api::router(AppState::new(engine));
    match Metrics::init(cfg.scrape_timeout().as_millis() as u64) {
        Ok(metrics) => router = router.merge(metrics.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    Ok(router.into())
}
