// src/ingest/types.rs
use std::time::Duration;

/// A rate successfully read from one source, exactly as the site renders it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RateReading {
    pub source: String, // e.g., "Gandyam Pay", "Ria Money Transfer"
    pub rate: String,   // raw text, not parsed to a number
}

impl RateReading {
    pub fn new(source: impl Into<String>, rate: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            rate: rate.into(),
        }
    }
}

/// Why a source produced no rate in this cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeFailure {
    /// Network unreachable, connection reset, non-2xx status.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The expected markup/DOM shape was not there. Carries the failing stage.
    #[error("rate not found: {0}")]
    RateNotFound(String),
    /// Browser could not be launched, navigate, or render.
    #[error("browser failure: {0}")]
    Browser(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ScrapeFailure {
    /// Stable short tag used in logs, metric labels and API bodies.
    pub fn reason(&self) -> &'static str {
        match self {
            ScrapeFailure::Transport(_) => "transport",
            ScrapeFailure::RateNotFound(_) => "rate_not_found",
            ScrapeFailure::Browser(_) => "browser",
            ScrapeFailure::Timeout(_) => "timeout",
        }
    }
}

pub type ScrapeOutcome = Result<RateReading, ScrapeFailure>;

/// One slot per configured source after a refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeReport {
    pub source: String,
    pub outcome: ScrapeOutcome,
}

impl ScrapeReport {
    pub fn reading(&self) -> Option<&RateReading> {
        self.outcome.as_ref().ok()
    }
}

#[async_trait::async_trait]
pub trait RateExtractor: Send + Sync {
    /// Source name, also the key the rate is stored under.
    fn source(&self) -> &str;

    /// One retrieval attempt. Never retries; every failure is returned, not raised.
    async fn extract(&self) -> ScrapeOutcome;
}
