//! One backfill pass over the stored article population.
//!
//! For each selected article the coordinator walks its ordered strategy list,
//! starting at the first strategy the article has not yet attempted, and stops
//! at the first success or when the list runs out. Every attempt is persisted
//! before the next one starts, so an interrupted run resumes from stored
//! state alone.
//!
//! Per article, across runs:
//!
//! ```text
//! Unseen --lightweight ok--> Resolved
//! Unseen --lightweight fail--> LightweightFailed --robust ok--> Resolved
//!                                                --robust fail--> BothFailed
//! Unseen (no url) --> SkippedNoUrl   (not persisted)
//! ```
//!
//! Strategy failures are data. A [`StoreError`] aborts the pass.

use crate::models::{Article, ExtractionRecord, ExtractionStatus, RecordUpdate, StrategyKind};
use crate::selector::{next_strategy, select};
use crate::stats::RunStats;
use crate::store::{StatusStore, StoreError};
use crate::strategies::{ExtractionOutcome, ExtractionStrategy};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Drives extraction passes with a fixed cascade of strategies.
pub struct ScrapeCoordinator {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    delay: Duration,
}

impl ScrapeCoordinator {
    /// `strategies` must be in cascade order, cheapest first.
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>, delay: Duration) -> Self {
        Self { strategies, delay }
    }

    /// Run one pass. Returns the pass statistics, or the first persistence error.
    #[instrument(level = "info", skip_all)]
    pub async fn run<S>(&self, store: &S) -> Result<RunStats, StoreError>
    where
        S: StatusStore + ?Sized,
    {
        let population = store.list_articles_with_records().await?;
        let population_size = population.len();
        let selected = select(population);
        let total = selected.len();
        info!(population = population_size, selected = total, "Articles needing content");

        let mut stats = RunStats::new(total);
        for (index, (article, record)) in selected.into_iter().enumerate() {
            let position = index + 1;
            let Some(url) = article.url.clone() else {
                info!(position, total, article_id = article.id, "Skipping article without URL");
                stats.skipped += 1;
                continue;
            };

            info!(
                position,
                total,
                article_id = article.id,
                %url,
                title = article.title.as_deref().unwrap_or(""),
                author = article.author.as_deref().unwrap_or(""),
                "Processing article"
            );
            self.process_article(store, &article, &url, record, &mut stats).await?;

            if position < total && !self.delay.is_zero() {
                sleep(self.delay).await;
            }
        }

        Ok(stats)
    }

    /// Let every strategy release its resources.
    pub async fn shutdown(&self) {
        for strategy in &self.strategies {
            strategy.shutdown().await;
        }
    }

    async fn process_article<S>(
        &self,
        store: &S,
        article: &Article,
        url: &str,
        mut record: Option<ExtractionRecord>,
        stats: &mut RunStats,
    ) -> Result<(), StoreError>
    where
        S: StatusStore + ?Sized,
    {
        let Some(start) = next_strategy(record.as_ref()) else {
            return Ok(());
        };

        let pending = self.strategies.iter().skip_while(|s| s.kind() != start);
        for strategy in pending {
            let kind = strategy.kind();
            // Succeeded and Failed are final for a strategy.
            let status = record.as_ref().map_or(ExtractionStatus::NotAttempted, |r| r.status(kind));
            if status != ExtractionStatus::NotAttempted {
                debug!(article_id = article.id, strategy = %kind, %status, "Strategy already settled");
                continue;
            }

            let outcome = strategy.attempt(url).await;
            let success = outcome.is_success();

            record = Some(persist_outcome(store, article.id, record, kind, &outcome).await?);
            stats.record_attempt(kind, success);

            match &outcome {
                ExtractionOutcome::Extracted(content) => {
                    info!(article_id = article.id, strategy = %kind, chars = content.chars().count(), "Content extracted");
                    return Ok(());
                }
                ExtractionOutcome::Failed(error) => {
                    warn!(article_id = article.id, strategy = %kind, %error, "Extraction failed");
                }
            }
        }

        Ok(())
    }
}

/// Persist one attempt and return the record as it now stands.
async fn persist_outcome<S>(
    store: &S,
    article_id: i64,
    record: Option<ExtractionRecord>,
    kind: StrategyKind,
    outcome: &ExtractionOutcome,
) -> Result<ExtractionRecord, StoreError>
where
    S: StatusStore + ?Sized,
{
    let status = ExtractionStatus::from_success(outcome.is_success());
    let update = RecordUpdate::for_attempt(kind, status, outcome.content().map(str::to_string));

    match record {
        Some(mut existing) => {
            store.update_record(&existing, &update).await?;
            existing.apply(&update);
            Ok(existing)
        }
        None => {
            let mut fresh = ExtractionRecord {
                id: 0,
                article_id,
                content: String::new(),
                lightweight_status: ExtractionStatus::NotAttempted,
                robust_status: ExtractionStatus::NotAttempted,
                created_at: None,
                updated_at: None,
            };
            fresh.apply(&update);
            store
                .create_record(article_id, &fresh.content, fresh.lightweight_status, fresh.robust_status)
                .await?;
            store
                .find_record_by_article_id(article_id)
                .await?
                .ok_or(StoreError::MissingRecord(article_id))
        }
    }
}
