//! Extraction strategies for pulling article body text from a URL.
//!
//! Every strategy implements [`ExtractionStrategy`] and is ordered from
//! cheapest to most robust:
//!
//! | Strategy | Module | Mechanism | Default timeout |
//! |----------|--------|-----------|-----------------|
//! | Lightweight | [`lightweight`] | Single HTTP GET, HTML parsed with `scraper` | 15s |
//! | Robust | [`robust`] | Headless Chromium render, waits for network idle | 30s |
//!
//! # Common Contract
//!
//! - Text shorter than [`MIN_CONTENT_CHARS`] is a failure ("content too short"),
//!   even when the fetch itself worked.
//! - Network, timeout and parse errors come back as [`ExtractionOutcome::Failed`]
//!   with a readable message. Nothing is raised past the strategy boundary.

pub mod lightweight;
pub mod robust;

use crate::models::StrategyKind;
use crate::utils::normalize_whitespace;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Minimum number of characters an extraction must yield to be accepted.
pub const MIN_CONTENT_CHARS: usize = 200;

/// Result of a single extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Accepted body text.
    Extracted(String),
    /// Human-readable reason the attempt failed.
    Failed(String),
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Extracted(_))
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            ExtractionOutcome::Extracted(content) => Some(content),
            ExtractionOutcome::Failed(_) => None,
        }
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        match self {
            ExtractionOutcome::Extracted(_) => None,
            ExtractionOutcome::Failed(error) => Some(error),
        }
    }
}

/// Errors raised inside a strategy. Always converted to [`ExtractionOutcome::Failed`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("browser error: {0}")]
    Browser(String),
    #[error("content too short ({found} < {min} characters)")]
    TooShort { found: usize, min: usize },
}

/// A pluggable way of turning a URL into article body text.
///
/// Implementations are pure functions of the URL: they know nothing about
/// persistence or which articles need work.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Which cascade slot this strategy fills.
    fn kind(&self) -> StrategyKind;

    /// Fetch `url` and extract its body text.
    async fn attempt(&self, url: &str) -> ExtractionOutcome;

    /// Release any long-lived resources after a pass.
    async fn shutdown(&self) {}
}

/// Parse and validate an article URL before any network traffic.
pub(crate) fn parse_article_url(url: &str) -> Result<url::Url, FetchError> {
    let parsed = url::Url::parse(url.trim())?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

/// Apply the shared length rule to raw extracted text.
///
/// # Arguments
///
/// * `raw` - Text as produced by a strategy, possibly with markup whitespace
///
/// # Returns
///
/// The whitespace-normalised text when it holds at least [`MIN_CONTENT_CHARS`]
/// characters.
///
/// # Errors
///
/// [`FetchError::TooShort`] with the character count found.
pub fn accept_content(raw: &str) -> Result<String, FetchError> {
    let text = normalize_whitespace(raw);
    let found = text.chars().count();
    if found < MIN_CONTENT_CHARS {
        return Err(FetchError::TooShort {
            found,
            min: MIN_CONTENT_CHARS,
        });
    }
    Ok(text)
}

/// Collapse an internal result into the outcome handed to the coordinator.
pub(crate) fn into_outcome(result: Result<String, FetchError>) -> ExtractionOutcome {
    match result {
        Ok(content) => ExtractionOutcome::Extracted(content),
        Err(e) => ExtractionOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_boundary() {
        let short = "a".repeat(MIN_CONTENT_CHARS - 1);
        let exact = "a".repeat(MIN_CONTENT_CHARS);

        assert!(matches!(accept_content(&short), Err(FetchError::TooShort { found: 199, .. })));
        assert_eq!(accept_content(&exact).unwrap().len(), 200);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 199 two-byte characters is still too short.
        let accented = "é".repeat(199);
        assert!(accept_content(&accented).is_err());
        assert!(accept_content(&"é".repeat(200)).is_ok());
    }

    #[test]
    fn test_whitespace_padding_does_not_count() {
        let padded = format!("   {}\n\n\n   ", "b".repeat(150));
        assert!(accept_content(&padded).is_err());
    }

    #[test]
    fn test_too_short_message() {
        let outcome = into_outcome(accept_content("tiny"));
        assert!(!outcome.is_success());
        assert!(outcome.error().unwrap().contains("content too short"));
        assert!(outcome.content().is_none());
    }

    #[test]
    fn test_parse_article_url() {
        assert!(parse_article_url("https://example.com/story").is_ok());
        assert!(matches!(
            parse_article_url("ftp://example.com/story"),
            Err(FetchError::UnsupportedScheme(_))
        ));
        assert!(matches!(parse_article_url("not a url"), Err(FetchError::InvalidUrl(_))));
    }
}
