use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::time::Instant;

use crate::ingest::normalize_rate_text;
use crate::ingest::types::{RateExtractor, RateReading, ScrapeFailure, ScrapeOutcome};
use crate::renderer::{BrowserLauncher, BrowserSession, NetworkIdle};

pub const SOURCE: &str = "Gandyam Pay";
pub const DEFAULT_URL: &str = "https://gandyampay.com";

/// The rate row is only recognizable by its exact inline style.
const RATE_ROW: &str =
    r#"div[style="display: flex; justify-content: space-between; align-items: center;"]"#;
const RATE_CELL: &str = "p";

/// Rendered-DOM extractor. The page fills its rates client-side, so the markup
/// is read from a headless browser after the network settles.
pub struct GandyamExtractor {
    url: String,
    launcher: Arc<dyn BrowserLauncher>,
    idle: NetworkIdle,
    navigation_timeout: Duration,
}

impl GandyamExtractor {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            launcher,
            idle: NetworkIdle::default(),
            navigation_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_idle(mut self, idle: NetworkIdle) -> Self {
        self.idle = idle;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// navigate → wait for idle → snapshot, bounded by `deadline` so the caller
    /// can still close.
    async fn read_rate(&self, session: &mut dyn BrowserSession, deadline: Instant) -> ScrapeOutcome {
        let snapshot = tokio::time::timeout_at(deadline, async {
            session.navigate(&self.url, self.idle).await?;
            session.rendered_html().await
        })
        .await
        .map_err(|_| ScrapeFailure::Timeout(self.navigation_timeout))?
        .map_err(|e| ScrapeFailure::Browser(format!("{e:#}")))?;

        let rate = select_rate(&snapshot).ok_or_else(|| {
            ScrapeFailure::RateNotFound(format!(
                "expected a second <{RATE_CELL}> inside the rate row on {}",
                self.url
            ))
        })?;
        Ok(RateReading::new(SOURCE, rate))
    }
}

/// Text of the second `<p>` in the rate row, whitespace collapsed. `None` if the
/// row is missing, has fewer than two cells, or the cell is blank.
pub fn select_rate(rendered: &str) -> Option<String> {
    let row_sel = Selector::parse(RATE_ROW).ok()?;
    let cell_sel = Selector::parse(RATE_CELL).ok()?;

    let document = Html::parse_document(rendered);
    let row = document.select(&row_sel).next()?;
    let cell = row.select(&cell_sel).nth(1)?;
    let rate = normalize_rate_text(&cell.text().collect::<String>());
    (!rate.is_empty()).then_some(rate)
}

#[async_trait]
impl RateExtractor for GandyamExtractor {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn extract(&self) -> ScrapeOutcome {
        // One deadline for launch and read; close runs after it.
        let deadline = Instant::now() + self.navigation_timeout;
        let mut session = tokio::time::timeout_at(deadline, self.launcher.launch())
            .await
            .map_err(|_| ScrapeFailure::Timeout(self.navigation_timeout))?
            .map_err(|e| ScrapeFailure::Browser(format!("{e:#}")))?;

        let outcome = self.read_rate(session.as_mut(), deadline).await;

        // Always release; a failed close is reported but never replaces the outcome.
        if let Err(e) = session.close().await {
            tracing::warn!(target: "ingest", source = SOURCE, error = ?e, "browser session close failed");
        }
        outcome
    }
}
