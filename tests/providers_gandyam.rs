// tests/providers_gandyam.rs
//
// Rendered-DOM extractor against a scripted browser: every path that gets a
// session must close it exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rate_aggregator::config::RatesConfig;
use rate_aggregator::ingest::providers::gandyam::{GandyamExtractor, SOURCE};
use rate_aggregator::renderer::{BrowserLauncher, BrowserSession, NetworkIdle};
use rate_aggregator::store::MemoryRateStore;
use rate_aggregator::{ingest, RateEngine, RateExtractor, RateStore, ScrapeFailure};

const RENDERED: &str = include_str!("fixtures/gandyam_rendered.html");
const LOADING: &str = include_str!("fixtures/gandyam_loading.html");

#[derive(Clone, Copy)]
enum Script {
    Render(&'static str),
    NavigateError,
    Hang,
    /// Renders fine, then fails to shut down.
    CloseError(&'static str),
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    closes: AtomicUsize,
}

#[derive(Clone, Copy, PartialEq)]
enum Launch {
    Ok,
    Fail,
    Hang,
}

struct FakeLauncher {
    script: Script,
    launch: Launch,
    counters: Arc<Counters>,
}

impl FakeLauncher {
    fn new(script: Script) -> (Arc<Self>, Arc<Counters>) {
        Self::with_launch(script, Launch::Ok)
    }

    fn with_launch(script: Script, launch: Launch) -> (Arc<Self>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let launcher = Arc::new(Self {
            script,
            launch,
            counters: Arc::clone(&counters),
        });
        (launcher, counters)
    }
}

struct FakeSession {
    script: Script,
    page: Option<&'static str>,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        match self.launch {
            Launch::Ok => {}
            Launch::Fail => bail!("no chromium on this box"),
            Launch::Hang => tokio::time::sleep(Duration::from_secs(60)).await,
        }
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            script: self.script,
            page: None,
            counters: Arc::clone(&self.counters),
        }))
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, _url: &str, _idle: NetworkIdle) -> Result<()> {
        match self.script {
            Script::Render(html) | Script::CloseError(html) => {
                self.page = Some(html);
                Ok(())
            }
            Script::NavigateError => bail!("net::ERR_NAME_NOT_RESOLVED"),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        }
    }

    async fn rendered_html(&self) -> Result<String> {
        Ok(self.page.unwrap_or("<html></html>").to_string())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        if let Script::CloseError(_) = self.script {
            bail!("browser process already gone");
        }
        Ok(())
    }
}

fn extractor(launcher: Arc<FakeLauncher>) -> GandyamExtractor {
    GandyamExtractor::new(launcher).with_navigation_timeout(Duration::from_millis(100))
}

#[tokio::test]
async fn rendered_rate_is_read_and_session_closed_once() {
    let (launcher, counters) = FakeLauncher::new(Script::Render(RENDERED));
    let reading = extractor(launcher).extract().await.expect("rate found");

    assert_eq!(reading.source, SOURCE);
    assert_eq!(reading.rate, "1 EUR = 655,50 XOF");
    assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_container_is_rate_not_found_and_closes() {
    let (launcher, counters) = FakeLauncher::new(Script::Render(LOADING));
    let err = extractor(launcher).extract().await.unwrap_err();

    assert!(matches!(err, ScrapeFailure::RateNotFound(_)), "got {err:?}");
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn navigation_error_is_browser_failure_and_closes() {
    let (launcher, counters) = FakeLauncher::new(Script::NavigateError);
    let err = extractor(launcher).extract().await.unwrap_err();

    assert_eq!(err.reason(), "browser");
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hung_navigation_times_out_and_still_closes() {
    let (launcher, counters) = FakeLauncher::new(Script::Hang);
    let err = extractor(launcher).extract().await.unwrap_err();

    assert_eq!(err, ScrapeFailure::Timeout(Duration::from_millis(100)));
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn close_failure_does_not_mask_the_rate() {
    let (launcher, counters) = FakeLauncher::new(Script::CloseError(RENDERED));
    let reading = extractor(launcher).extract().await.expect("rate survives close error");

    assert_eq!(reading.rate, "1 EUR = 655,50 XOF");
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_launch_has_nothing_to_close() {
    let (launcher, counters) = FakeLauncher::with_launch(Script::Render(RENDERED), Launch::Fail);
    let err = extractor(launcher).extract().await.unwrap_err();

    assert_eq!(err.reason(), "browser");
    assert_eq!(counters.launches.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hung_launch_times_out_with_nothing_to_close() {
    let (launcher, counters) = FakeLauncher::with_launch(Script::Render(RENDERED), Launch::Hang);
    let err = extractor(launcher).extract().await.unwrap_err();

    assert_eq!(err, ScrapeFailure::Timeout(Duration::from_millis(100)));
    assert_eq!(counters.launches.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn orchestrator_deadline_leaves_time_to_close() {
    let (launcher, counters) = FakeLauncher::new(Script::Hang);
    let extractors: Vec<Arc<dyn RateExtractor>> = vec![Arc::new(extractor(launcher))];

    let reports = ingest::refresh_all(&extractors, Duration::from_millis(400)).await;

    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].outcome,
        Err(ScrapeFailure::Timeout(Duration::from_millis(100)))
    );
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn short_scrape_timeout_from_config_still_closes_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rates.toml");
    std::fs::write(
        &path,
        r#"
[scrape]
timeout_secs = 1

[browser]
navigation_timeout_secs = 45

[sources.ria]
enabled = false
url = "http://127.0.0.1:9/"
"#,
    )
    .unwrap();
    let cfg = RatesConfig::load_from_file(&path).unwrap();
    assert!(cfg.navigation_timeout() < cfg.scrape_timeout());

    let (launcher, counters) = FakeLauncher::new(Script::Hang);
    let store = Arc::new(MemoryRateStore::new());
    let eng = RateEngine::from_config(&cfg, store.clone(), launcher);

    let outcome = eng.refresh().await;

    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(
        outcome.reports[0].outcome,
        Err(ScrapeFailure::Timeout(cfg.navigation_timeout()))
    );
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1, "session closed exactly once");
    assert!(store.find_all().await.unwrap().is_empty());
}
