//! Data models for stored articles and their extraction records.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: An article discovered upstream, read-only to this tool
//! - [`ExtractionRecord`]: The durable per-article record of extraction attempts
//! - [`ExtractionStatus`]: The tri-state outcome of one strategy for one article
//! - [`StrategyKind`]: Identifies which extraction strategy a status belongs to
//! - [`RecordUpdate`]: A partial update applied to an existing record
//!
//! Storage represents [`ExtractionStatus`] as a nullable boolean. The conversion
//! lives here ([`ExtractionStatus::from_stored`] / [`ExtractionStatus::to_stored`])
//! and is only called from the persistence adapter.

use chrono::{DateTime, Utc};
use std::fmt;

/// An article as discovered by upstream ingestion.
///
/// Only `id` and `url` matter to the backfill; the remaining metadata is
/// carried along for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Primary key of the article.
    pub id: i64,
    /// The source URL, if ingestion captured one.
    pub url: Option<String>,
    /// The headline, if known.
    pub title: Option<String>,
    /// The byline, if known.
    pub author: Option<String>,
}

/// Outcome of one extraction strategy for one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionStatus {
    #[default]
    NotAttempted,
    Succeeded,
    Failed,
}

impl ExtractionStatus {
    /// Decode the nullable-boolean storage form.
    pub fn from_stored(value: Option<bool>) -> Self {
        match value {
            None => ExtractionStatus::NotAttempted,
            Some(true) => ExtractionStatus::Succeeded,
            Some(false) => ExtractionStatus::Failed,
        }
    }

    /// Encode into the nullable-boolean storage form.
    pub fn to_stored(self) -> Option<bool> {
        match self {
            ExtractionStatus::NotAttempted => None,
            ExtractionStatus::Succeeded => Some(true),
            ExtractionStatus::Failed => Some(false),
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            ExtractionStatus::Succeeded
        } else {
            ExtractionStatus::Failed
        }
    }
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionStatus::NotAttempted => "not_attempted",
            ExtractionStatus::Succeeded => "succeeded",
            ExtractionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The extraction strategies, in cascade order from cheapest to most robust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Single HTTP fetch plus HTML parsing.
    Lightweight,
    /// Headless browser render.
    Robust,
}

impl StrategyKind {
    /// Cascade order. A strategy is only tried once every earlier one has failed.
    pub const CASCADE: [StrategyKind; 2] = [StrategyKind::Lightweight, StrategyKind::Robust];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Lightweight => "lightweight",
            StrategyKind::Robust => "robust",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted extraction record for an article.
///
/// Created on the first attempt for an article (success or failure), updated
/// in place on later attempts, never deleted by this tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRecord {
    /// Primary key of the record.
    pub id: i64,
    /// The article this record belongs to.
    pub article_id: i64,
    /// Extracted body text; empty while no strategy has succeeded.
    pub content: String,
    pub lightweight_status: ExtractionStatus,
    pub robust_status: ExtractionStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExtractionRecord {
    /// Status recorded for the given strategy.
    pub fn status(&self, kind: StrategyKind) -> ExtractionStatus {
        match kind {
            StrategyKind::Lightweight => self.lightweight_status,
            StrategyKind::Robust => self.robust_status,
        }
    }

    /// Apply a partial update to this in-memory copy.
    pub fn apply(&mut self, update: &RecordUpdate) {
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        if let Some(status) = update.lightweight_status {
            self.lightweight_status = status;
        }
        if let Some(status) = update.robust_status {
            self.robust_status = status;
        }
    }
}

/// Fields to change on an existing [`ExtractionRecord`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub content: Option<String>,
    pub lightweight_status: Option<ExtractionStatus>,
    pub robust_status: Option<ExtractionStatus>,
}

impl RecordUpdate {
    /// Set the status for `kind`, and the content if the attempt produced any.
    pub fn for_attempt(kind: StrategyKind, status: ExtractionStatus, content: Option<String>) -> Self {
        let mut update = RecordUpdate {
            content,
            ..Default::default()
        };
        match kind {
            StrategyKind::Lightweight => update.lightweight_status = Some(status),
            StrategyKind::Robust => update.robust_status = Some(status),
        }
        update
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.lightweight_status.is_none() && self.robust_status.is_none()
    }
}
