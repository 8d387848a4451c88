//! Headless-browser abstraction used by rendered-DOM extractors.
//!
//! A [`BrowserLauncher`] is built once at startup and handed to the extractors
//! that need it. Each extraction asks it for a fresh [`BrowserSession`], which
//! the caller must [`close`](BrowserSession::close) on every exit path.

pub mod chromium;
pub mod idle;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use idle::IdleTracker;

/// "Page finished loading" heuristic: at most `max_inflight` requests pending
/// for at least `quiet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdle {
    pub max_inflight: usize,
    pub quiet: Duration,
}

impl Default for NetworkIdle {
    fn default() -> Self {
        Self {
            max_inflight: 2,
            quiet: Duration::from_millis(500),
        }
    }
}

/// Starts isolated browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// One isolated browser session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate and return once the network is idle per `idle`.
    async fn navigate(&mut self, url: &str, idle: NetworkIdle) -> Result<()>;
    /// Serialized live DOM of the current page.
    async fn rendered_html(&self) -> Result<String>;
    /// Release the session. Called exactly once.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Launcher used when no browser is available; every launch fails.
pub struct NoopLauncher;

#[async_trait]
impl BrowserLauncher for NoopLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Err(anyhow::anyhow!("browser not available"))
    }
}
