//! Selection of articles that still need extraction work.
//!
//! An article is selected when some strategy in [`StrategyKind::CASCADE`] is
//! still `NotAttempted` and every strategy before it has `Failed`. An article
//! without a record counts as all-`NotAttempted`.
//!
//! | lightweight | robust | selected | next |
//! |---|---|---|---|
//! | (no record) | - | yes | lightweight |
//! | NotAttempted | any | yes | lightweight |
//! | Failed | NotAttempted | yes | robust |
//! | Failed | Failed | no | exhausted |
//! | Succeeded | any | no | resolved |
//!
//! Articles without a URL are still selected; the coordinator counts them as
//! skipped so they stay distinct from resolved articles.

use crate::models::{Article, ExtractionRecord, ExtractionStatus, StrategyKind};
use tracing::{debug, instrument};

/// The strategy to attempt next for an article, or `None` if it is resolved or exhausted.
pub fn next_strategy(record: Option<&ExtractionRecord>) -> Option<StrategyKind> {
    let Some(record) = record else {
        return StrategyKind::CASCADE.first().copied();
    };

    for kind in StrategyKind::CASCADE {
        match record.status(kind) {
            ExtractionStatus::Failed => continue,
            ExtractionStatus::NotAttempted => return Some(kind),
            ExtractionStatus::Succeeded => return None,
        }
    }
    None
}

/// Filter the article population to those with remaining work.
///
/// # Arguments
///
/// * `population` - Every article paired with its extraction record, if one exists
///
/// # Returns
///
/// The articles for which [`next_strategy`] names a strategy, in enumeration
/// order. Articles without a URL are kept.
#[instrument(level = "info", skip_all)]
pub fn select(
    population: Vec<(Article, Option<ExtractionRecord>)>,
) -> Vec<(Article, Option<ExtractionRecord>)> {
    let population_size = population.len();
    let selected: Vec<_> = population
        .into_iter()
        .filter(|(article, record)| {
            let next = next_strategy(record.as_ref());
            if next.is_none() {
                debug!(article_id = article.id, "Article already resolved or exhausted");
            }
            next.is_some()
        })
        .collect();

    debug!(population = population_size, selected = selected.len(), "Selected articles");
    selected
}
