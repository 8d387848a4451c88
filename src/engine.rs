//! # Rate Engine
//! Owns the configured extractors and the store handle, both injected at
//! construction. One `refresh` = scrape every source concurrently, then
//! reconcile the successful readings into the store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::RatesConfig;
use crate::ingest::providers::{gandyam::GandyamExtractor, ria::RiaExtractor};
use crate::ingest::types::{RateExtractor, ScrapeReport};
use crate::reconcile::{self, ReconcileSummary};
use crate::renderer::BrowserLauncher;
use crate::store::{RateRecord, RateStore};

/// Result of one refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub reports: Vec<ScrapeReport>,
    pub summary: ReconcileSummary,
}

impl RefreshOutcome {
    /// Sources whose rate was written this cycle.
    pub fn updated_sources(&self) -> Vec<String> {
        self.summary
            .committed
            .iter()
            .map(|r| r.source.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct RateEngine {
    store: Arc<dyn RateStore>,
    extractors: Vec<Arc<dyn RateExtractor>>,
    timeout: Duration,
}

impl RateEngine {
    pub fn new(
        store: Arc<dyn RateStore>,
        extractors: Vec<Arc<dyn RateExtractor>>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            extractors,
            timeout,
        }
    }

    /// Build the enabled extractors from config. The launcher is shared by every
    /// rendered-DOM source.
    pub fn from_config(
        cfg: &RatesConfig,
        store: Arc<dyn RateStore>,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        let mut extractors: Vec<Arc<dyn RateExtractor>> = Vec::new();
        if cfg.sources.gandyam.enabled {
            extractors.push(Arc::new(
                GandyamExtractor::new(launcher)
                    .with_url(&cfg.sources.gandyam.url)
                    .with_idle(cfg.network_idle())
                    .with_navigation_timeout(cfg.navigation_timeout()),
            ));
        }
        if cfg.sources.ria.enabled {
            extractors.push(Arc::new(RiaExtractor::from_url(&cfg.sources.ria.url)));
        }
        Self::new(store, extractors, cfg.scrape_timeout())
    }

    pub fn sources(&self) -> Vec<String> {
        self.extractors
            .iter()
            .map(|e| e.source().to_string())
            .collect()
    }

    /// Current records, unfiltered.
    pub async fn latest(&self) -> Result<Vec<RateRecord>> {
        self.store.find_all().await
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let reports = crate::ingest::refresh_all(&self.extractors, self.timeout).await;
        let summary = reconcile::apply(self.store.as_ref(), &reports).await;

        if !reports.is_empty() && summary.skipped.len() == reports.len() {
            tracing::warn!(
                target: "ingest",
                sources = reports.len(),
                "refresh cycle completed but no source produced a rate"
            );
        }
        tracing::info!(
            target: "ingest",
            committed = summary.committed_count(),
            skipped = summary.skipped.len(),
            store_errors = summary.store_errors.len(),
            "refresh cycle reconciled"
        );

        RefreshOutcome { reports, summary }
    }
}
