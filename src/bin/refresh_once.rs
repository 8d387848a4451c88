//! One refresh cycle without the HTTP server: scrape every configured source,
//! reconcile into the configured store, print the stored rates as JSON.

use std::process::ExitCode;
use std::sync::Arc;

use rate_aggregator::config::RatesConfig;
use rate_aggregator::renderer::chromium::ChromiumLauncher;
use rate_aggregator::store::SqliteRateStore;
use rate_aggregator::RateEngine;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();
    rate_aggregator::init_tracing();

    let cfg = RatesConfig::load_default()?;
    let store = SqliteRateStore::open(&cfg.store.path)?;
    let launcher = ChromiumLauncher::new(cfg.browser.chromium_path.clone(), cfg.navigation_timeout());
    let engine = RateEngine::from_config(&cfg, Arc::new(store), Arc::new(launcher));

    let outcome = engine.refresh().await;
    for (source, reason) in &outcome.summary.skipped {
        eprintln!("{source}: no rate ({reason})");
    }

    let rates = engine.latest().await?;
    println!("{}", serde_json::to_string_pretty(&rates)?);

    if outcome.summary.has_store_errors() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
