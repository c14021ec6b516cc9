//! Lightweight extraction: one HTTP GET, body text isolated from the static HTML.
//!
//! Paragraph text is collected from the first container that yields any, in
//! order `article`, `main`, `body`. Paragraphs nested in navigation or other
//! boilerplate containers are ignored.

use super::{ExtractionOutcome, ExtractionStrategy, FetchError, accept_content, into_outcome, parse_article_url};
use crate::models::StrategyKind;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Containers tried in order when looking for article paragraphs.
static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", "main", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static PARAGRAPH_SELECTOR: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("p").ok());

/// Elements whose text is never part of the article body.
const BOILERPLATE_TAGS: [&str; 9] = [
    "nav", "header", "footer", "aside", "script", "style", "noscript", "form", "figcaption",
];

/// Settings for [`LightweightStrategy`].
#[derive(Debug, Clone)]
pub struct LightweightConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for LightweightConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Single-request HTML extractor.
#[derive(Debug, Clone)]
pub struct LightweightStrategy {
    client: reqwest::Client,
    timeout: Duration,
}

impl LightweightStrategy {
    pub fn new(config: LightweightConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let url = parse_article_url(url)?;
        let response = self.client.get(url).send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Http(e)
        }
    }
}

#[async_trait]
impl ExtractionStrategy for LightweightStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Lightweight
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn attempt(&self, url: &str) -> ExtractionOutcome {
        let t0 = Instant::now();
        let result = match self.fetch_html(url).await {
            Ok(html) => {
                debug!(bytes = html.len(), "Fetched HTML");
                accept_content(&extract_body_text(&html))
            }
            Err(e) => Err(e),
        };

        let elapsed_ms = t0.elapsed().as_millis() as u64;
        match &result {
            Ok(content) => info!(chars = content.chars().count(), elapsed_ms, "Lightweight extraction succeeded"),
            Err(e) => warn!(error = %truncate_for_log(&e.to_string(), 200), elapsed_ms, "Lightweight extraction failed"),
        }
        into_outcome(result)
    }
}

/// Pull readable paragraph text out of an HTML document.
pub fn extract_body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(paragraph) = PARAGRAPH_SELECTOR.as_ref() else {
        return String::new();
    };

    for container_selector in CONTAINER_SELECTORS.iter() {
        let text = document
            .select(container_selector)
            .flat_map(|container| container.select(paragraph))
            .filter(|p| !inside_boilerplate(p))
            .map(|p| p.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|t| !t.is_empty())
            .unique()
            .join("\n\n");

        if !text.is_empty() {
            return text;
        }
    }
    String::new()
}

fn inside_boilerplate(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| BOILERPLATE_TAGS.contains(&ancestor.value().name()))
}
