// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod reconcile;
pub mod renderer;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::engine::{RateEngine, RefreshOutcome};
pub use crate::ingest::types::{RateExtractor, RateReading, ScrapeFailure, ScrapeReport};
pub use crate::store::{RateRecord, RateStore};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the compact tracing subscriber. Safe to call when a subscriber is
/// already set (the shuttle runtime may install its own); the call is then a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chromiumoxide=warn,hyper=warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
