use async_trait::async_trait;
use metrics::histogram;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::ingest::normalize_rate_text;
use crate::ingest::types::{RateExtractor, RateReading, ScrapeFailure, ScrapeOutcome};

pub const SOURCE: &str = "Ria Money Transfer";
pub const DEFAULT_URL: &str = "https://www.riamoneytransfer.com/fr-fr";

/// The calculator's amount field; its `value` holds the current quote.
const RATE_INPUT: &str = r#"input[placeholder="0"]"#;

/// Static-markup extractor: one GET, one structural query over the returned HTML.
pub struct RiaExtractor {
    mode: Mode,
}

enum Mode {
    // Own copy of the markup so tests can build it from any &str.
    Fixture(String),
    Http { url: String, client: Client },
}

impl RiaExtractor {
    pub fn from_fixture(markup: &str) -> Self {
        Self {
            mode: Mode::Fixture(markup.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::with_client(url, Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    async fn fetch(url: &str, client: &Client) -> Result<String, ScrapeFailure> {
        let resp = client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScrapeFailure::Transport(format!("GET {url}: {e}")))?;
        resp.text()
            .await
            .map_err(|e| ScrapeFailure::Transport(format!("reading body of {url}: {e}")))
    }
}

/// Reads the `value` attribute of the first amount input. `None` when the input
/// is missing or carries no usable value.
pub fn select_rate(markup: &str) -> Option<String> {
    let sel = Selector::parse(RATE_INPUT).ok()?;
    let document = Html::parse_document(markup);
    let input = document.select(&sel).next()?;
    let rate = normalize_rate_text(input.value().attr("value")?);
    (!rate.is_empty()).then_some(rate)
}

#[async_trait]
impl RateExtractor for RiaExtractor {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn extract(&self) -> ScrapeOutcome {
        let markup = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { url, client } => Self::fetch(url, client).await?,
        };

        let t0 = std::time::Instant::now();
        let rate = select_rate(&markup).ok_or_else(|| {
            ScrapeFailure::RateNotFound(format!("no value on {RATE_INPUT} in fetched markup"))
        })?;

        histogram!("scrape_parse_ms", "source" => SOURCE)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(RateReading::new(SOURCE, rate))
    }
}
