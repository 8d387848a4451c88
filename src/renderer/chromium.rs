//! Chromium sessions driven through chromiumoxide.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::page::Page;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::task::JoinHandle;

use super::{BrowserLauncher, BrowserSession, IdleTracker, NetworkIdle};

const ENV_CHROMIUM_PATH: &str = "RATES_CHROMIUM_PATH";
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Network activity seen by the idle tracker, keyed by CDP request id.
enum Activity {
    Started(String),
    Done(String),
}

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Locate a Chromium binary: `$RATES_CHROMIUM_PATH`, then the usual names on PATH.
/// `None` lets chromiumoxide fall back to its own detection.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(ENV_CHROMIUM_PATH) {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }
    ["google-chrome", "chromium", "chromium-browser"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

/// Launches one headless Chromium process per session.
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    request_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(executable: Option<PathBuf>, request_timeout: Duration) -> Self {
        Self {
            executable: executable.or_else(find_chromium),
            request_timeout,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let profile_dir = std::env::temp_dir().join(format!(
            "rate-aggregator-{}-{}",
            std::process::id(),
            SESSION_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&profile_dir)
            .request_timeout(self.request_timeout)
            .new_headless_mode()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                // The session never reached the caller, so release it here.
                let session = ChromiumSession {
                    browser,
                    page: None,
                    handler_task,
                    profile_dir,
                };
                let _ = Box::new(session).close().await;
                return Err(e).context("failed to open page");
            }
        };

        tracing::debug!(target: "renderer", profile = %profile_dir.display(), "chromium session launched");
        Ok(Box::new(ChromiumSession {
            browser,
            page: Some(page),
            handler_task,
            profile_dir,
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().context("session has no open page")
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, idle: NetworkIdle) -> Result<()> {
        let page = self.page()?;

        // Listen before navigating so the page's own requests are counted.
        let started: BoxStream<'static, Activity> = page
            .event_listener::<EventRequestWillBeSent>()
            .await?
            .map(|ev| Activity::Started(ev.request_id.inner().clone()))
            .boxed();
        let finished: BoxStream<'static, Activity> = page
            .event_listener::<EventLoadingFinished>()
            .await?
            .map(|ev| Activity::Done(ev.request_id.inner().clone()))
            .boxed();
        let failed: BoxStream<'static, Activity> = page
            .event_listener::<EventLoadingFailed>()
            .await?
            .map(|ev| Activity::Done(ev.request_id.inner().clone()))
            .boxed();
        let mut activity = stream::select_all(vec![started, finished, failed]);

        page.goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;

        let mut tracker = IdleTracker::new(idle, Instant::now());
        loop {
            tokio::select! {
                Some(event) = activity.next() => match event {
                    Activity::Started(id) => tracker.request_started(&id, Instant::now()),
                    Activity::Done(id) => tracker.request_done(&id, Instant::now()),
                },
                _ = tokio::time::sleep(IDLE_POLL) => {}
            }
            if tracker.is_idle(Instant::now()) {
                break;
            }
        }
        tracing::debug!(target: "renderer", url, inflight = tracker.inflight(), "network idle");
        Ok(())
    }

    async fn rendered_html(&self) -> Result<String> {
        self.page()?
            .content()
            .await
            .context("failed to read rendered DOM")
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        let closed = self.browser.close().await.context("failed to close Chromium");
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        let _ = tokio::fs::remove_dir_all(&self.profile_dir).await;
        closed.map(|_| ())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Covers sessions dropped by an outer cancellation; Browser's own drop
        // kills the child process. After a regular close the dir is already gone.
        self.handler_task.abort();
        let _ = std::fs::remove_dir_all(&self.profile_dir);
    }
}
