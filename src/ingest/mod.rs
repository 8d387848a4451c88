// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ingest::types::{RateExtractor, ScrapeFailure, ScrapeReport};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_runs_total", "Refresh cycles started.");
        describe_counter!(
            "scrape_success_total",
            "Sources that produced a rate, by source."
        );
        describe_counter!(
            "scrape_failures_total",
            "Sources that produced no rate, by source and reason."
        );
        describe_histogram!(
            "scrape_duration_ms",
            "Wall time of one extractor invocation in milliseconds."
        );
        describe_histogram!("scrape_parse_ms", "Markup query time in milliseconds.");
    });
}

/// Collapse inner whitespace runs and trim, the way a browser's `innerText`
/// presents a cell.
pub fn normalize_rate_text(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(s.trim(), " ").into_owned()
}

/// Run one extractor under a deadline. An elapsed deadline is a failure of
/// that source only.
async fn run_bounded(extractor: &dyn RateExtractor, timeout: Duration) -> ScrapeReport {
    let source = extractor.source().to_string();
    let t0 = Instant::now();

    let outcome = match tokio::time::timeout(timeout, extractor.extract()).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ScrapeFailure::Timeout(timeout)),
    };

    histogram!("scrape_duration_ms", "source" => source.clone())
        .record(t0.elapsed().as_secs_f64() * 1_000.0);

    match &outcome {
        Ok(reading) => {
            counter!("scrape_success_total", "source" => source.clone()).increment(1);
            tracing::debug!(target: "ingest", source = %source, rate = %reading.rate, "rate scraped");
        }
        Err(e) => {
            counter!(
                "scrape_failures_total",
                "source" => source.clone(),
                "reason" => e.reason()
            )
            .increment(1);
            tracing::warn!(target: "ingest", source = %source, reason = e.reason(), error = %e, "source produced no rate");
        }
    }

    ScrapeReport { source, outcome }
}

/// Run every extractor concurrently. Returns one report per extractor, in input
/// order; a failing or hung source never blocks the others.
pub async fn refresh_all(
    extractors: &[Arc<dyn RateExtractor>],
    timeout: Duration,
) -> Vec<ScrapeReport> {
    ensure_metrics_described();
    counter!("scrape_runs_total").increment(1);

    let reports = futures::future::join_all(
        extractors
            .iter()
            .map(|ex| run_bounded(ex.as_ref(), timeout)),
    )
    .await;

    let ok = reports.iter().filter(|r| r.outcome.is_ok()).count();
    tracing::info!(
        target: "ingest",
        sources = reports.len(),
        ok,
        failed = reports.len() - ok,
        "refresh cycle scraped"
    );
    reports
}
