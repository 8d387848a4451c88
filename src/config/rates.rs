// src/config/rates.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::{gandyam, ria};
use crate::renderer::NetworkIdle;

pub const ENV_RATES_CONFIG_PATH: &str = "RATES_CONFIG_PATH";
pub const DEFAULT_RATES_CONFIG_PATH: &str = "config/rates.toml";

fn default_store_path() -> String {
    "data/rates.db".to_string()
}
fn default_scrape_timeout_secs() -> u64 {
    60
}
fn default_navigation_timeout_secs() -> u64 {
    45
}
fn default_idle_max_inflight() -> usize {
    2
}
fn default_idle_quiet_ms() -> u64 {
    500
}
/// Part of the scrape budget kept free for closing a browser session.
const CLOSE_HEADROOM_DIVISOR: u32 = 4;

fn default_true() -> bool {
    true
}
fn default_ria_url() -> String {
    ria::DEFAULT_URL.to_string()
}
fn default_gandyam_url() -> String {
    gandyam::DEFAULT_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RatesConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file, or ":memory:".
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Upper bound for one extractor invocation.
    #[serde(default = "default_scrape_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub chromium_path: Option<PathBuf>,
    /// Navigation + network-idle wait + DOM snapshot, per session.
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_idle_max_inflight")]
    pub idle_max_inflight: usize,
    #[serde(default = "default_idle_quiet_ms")]
    pub idle_quiet_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceToggle {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_ria_source")]
    pub ria: SourceToggle,
    #[serde(default = "default_gandyam_source")]
    pub gandyam: SourceToggle,
}

fn default_ria_source() -> SourceToggle {
    SourceToggle {
        enabled: true,
        url: default_ria_url(),
    }
}
fn default_gandyam_source() -> SourceToggle {
    SourceToggle {
        enabled: true,
        url: default_gandyam_url(),
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scrape_timeout_secs(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chromium_path: None,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            idle_max_inflight: default_idle_max_inflight(),
            idle_quiet_ms: default_idle_quiet_ms(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ria: default_ria_source(),
            gandyam: default_gandyam_source(),
        }
    }
}

impl RatesConfig {
    /// Load from an explicit TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading rates config from {}", path.display()))?;
        let cfg: RatesConfig = toml::from_str(&data)
            .with_context(|| format!("parsing rates config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $RATES_CONFIG_PATH (must exist)
    /// 2) config/rates.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_RATES_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("{ENV_RATES_CONFIG_PATH} points to non-existent path");
            }
            return Self::load_from_file(&pb);
        }
        let fallback = PathBuf::from(DEFAULT_RATES_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Ok(Self::default())
    }

    /// Zero timeouts would fail every source instantly; fall back to defaults.
    /// Navigation must end before the scrape deadline, with room left to close.
    fn sanitized(mut self) -> Self {
        if self.scrape.timeout_secs == 0 {
            self.scrape.timeout_secs = default_scrape_timeout_secs();
        }
        if self.browser.navigation_timeout_secs == 0 {
            self.browser.navigation_timeout_secs = default_navigation_timeout_secs();
        }
        let scrape = self.scrape.timeout_secs;
        let ceiling = scrape - (scrape / u64::from(CLOSE_HEADROOM_DIVISOR)).max(1);
        if ceiling > 0 && self.browser.navigation_timeout_secs > ceiling {
            self.browser.navigation_timeout_secs = ceiling;
        }
        if self.store.path.trim().is_empty() {
            self.store.path = default_store_path();
        }
        self
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape.timeout_secs)
    }

    /// Per-session bound for launch + navigation + snapshot. Never more than
    /// three quarters of the scrape timeout, also for budgets too small to
    /// express in whole seconds.
    pub fn navigation_timeout(&self) -> Duration {
        let budget = self.scrape_timeout();
        let ceiling = budget - budget / CLOSE_HEADROOM_DIVISOR;
        Duration::from_secs(self.browser.navigation_timeout_secs).min(ceiling)
    }

    pub fn network_idle(&self) -> NetworkIdle {
        NetworkIdle {
            max_inflight: self.browser.idle_max_inflight,
            quiet: Duration::from_millis(self.browser.idle_quiet_ms),
        }
    }
}
