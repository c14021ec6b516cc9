//! Robust extraction: render the page in headless Chromium and read the live DOM.
//!
//! The browser is launched on the first attempt and reused for the rest of
//! the pass. A launch failure is reported as an ordinary failed attempt and
//! the next attempt tries to launch again. A session whose CDP connection has
//! ended, or that can no longer open a page, is discarded the same way.
//!
//! "Network idle" is approximated by polling the number of resource timing
//! entries until it stops growing for [`IDLE_WINDOW`].

use super::{ExtractionOutcome, ExtractionStrategy, FetchError, accept_content, into_outcome, parse_article_url};
use crate::models::StrategyKind;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// How long the resource count must stay flat before the page counts as idle.
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Counts resource loads seen so far by the page.
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// Strips boilerplate from a detached copy of the DOM and returns the article text.
const BODY_TEXT_SCRIPT: &str = r#"
(() => {
  const root = document.querySelector('article') || document.querySelector('main') || document.body;
  if (!root) { return ''; }
  const copy = root.cloneNode(true);
  copy.querySelectorAll('nav, header, footer, aside, script, style, noscript, form, figcaption, iframe')
      .forEach((el) => el.remove());
  const paragraphs = Array.from(copy.querySelectorAll('p'))
      .map((p) => p.textContent.trim())
      .filter((t) => t.length > 0);
  return paragraphs.length > 0 ? paragraphs.join('\n\n') : (copy.textContent || '');
})()
"#;

/// Settings for [`RobustStrategy`].
#[derive(Debug, Clone)]
pub struct RobustConfig {
    /// Bound on navigation, idle wait and text extraction together.
    pub timeout: Duration,
    /// Chromium binary; auto-detected when `None`.
    pub chrome_executable: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            chrome_executable: None,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A running browser plus the task driving its CDP connection.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// The handler task exits once the connection to Chromium is gone.
    fn is_dead(&self) -> bool {
        self.handler.is_finished()
    }

    /// Drop a session that can no longer be driven. Dropping the browser kills its process.
    fn discard(self) {
        self.handler.abort();
        warn!("Discarded headless browser session; the next attempt relaunches it");
    }
}

/// Take the value out of `slot` if `is_dead` reports it unusable.
fn take_dead<T>(slot: &mut Option<T>, is_dead: impl FnOnce(&T) -> bool) -> Option<T> {
    if slot.as_ref().is_some_and(is_dead) {
        slot.take()
    } else {
        None
    }
}

/// Headless-browser extractor.
pub struct RobustStrategy {
    config: RobustConfig,
    session: Mutex<Option<BrowserSession>>,
}

impl std::fmt::Debug for RobustStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobustStrategy")
            .field("config", &self.config)
            .finish()
    }
}

impl RobustStrategy {
    pub fn new(config: RobustConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    #[instrument(level = "info", skip_all)]
    async fn launch(&self) -> Result<BrowserSession, FetchError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.config.timeout)
            .arg(format!("--user-agent={}", self.config.user_agent));
        if let Some(path) = &self.config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        info!("Launched headless browser");
        Ok(BrowserSession { browser, handler })
    }

    async fn render(&self, url: &str) -> Result<String, FetchError> {
        let url = parse_article_url(url)?;

        let mut guard = self.session.lock().await;
        if let Some(dead) = take_dead(&mut *guard, BrowserSession::is_dead) {
            dead.discard();
        }
        if guard.is_none() {
            *guard = Some(self.launch().await?);
        }
        let Some(session) = guard.as_ref() else {
            return Err(FetchError::Browser("browser session unavailable".to_string()));
        };

        let opened = session.browser.new_page("about:blank").await;
        let page = match opened {
            Ok(page) => page,
            Err(e) => {
                if let Some(session) = guard.take() {
                    session.discard();
                }
                return Err(FetchError::Browser(e.to_string()));
            }
        };

        let result = tokio::time::timeout(self.config.timeout, read_page(&page, url.as_str()))
            .await
            .unwrap_or(Err(FetchError::Timeout(self.config.timeout)));

        if let Err(e) = page.close().await {
            debug!(error = %e, "Failed to close page");
        }
        if result.is_err() {
            if let Some(dead) = take_dead(&mut *guard, BrowserSession::is_dead) {
                dead.discard();
            }
        }
        result
    }
}

async fn read_page(page: &Page, url: &str) -> Result<String, FetchError> {
    page.goto(url)
        .await
        .map_err(|e| FetchError::Browser(e.to_string()))?;
    wait_for_network_idle(page).await?;

    page.evaluate(BODY_TEXT_SCRIPT)
        .await
        .map_err(|e| FetchError::Browser(e.to_string()))?
        .into_value::<String>()
        .map_err(|e| FetchError::Browser(e.to_string()))
}

async fn wait_for_network_idle(page: &Page) -> Result<(), FetchError> {
    let mut last = resource_count(page).await?;
    loop {
        tokio::time::sleep(IDLE_WINDOW).await;
        let current = resource_count(page).await?;
        if current == last {
            debug!(resources = current, "Network idle");
            return Ok(());
        }
        last = current;
    }
}

async fn resource_count(page: &Page) -> Result<f64, FetchError> {
    page.evaluate(RESOURCE_COUNT_SCRIPT)
        .await
        .map_err(|e| FetchError::Browser(e.to_string()))?
        .into_value::<f64>()
        .map_err(|e| FetchError::Browser(e.to_string()))
}

#[async_trait]
impl ExtractionStrategy for RobustStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Robust
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn attempt(&self, url: &str) -> ExtractionOutcome {
        let t0 = Instant::now();
        let result = match self.render(url).await {
            Ok(text) => accept_content(&text),
            Err(e) => Err(e),
        };

        let elapsed_ms = t0.elapsed().as_millis() as u64;
        match &result {
            Ok(content) => info!(chars = content.chars().count(), elapsed_ms, "Robust extraction succeeded"),
            Err(e) => warn!(error = %truncate_for_log(&e.to_string(), 200), elapsed_ms, "Robust extraction failed"),
        }
        into_outcome(result)
    }

    async fn shutdown(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        if let Err(e) = session.browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        let _ = session.browser.wait().await;
        session.handler.abort();
        info!("Headless browser shut down");
    }
}
