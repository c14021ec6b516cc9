//! Run statistics and the end-of-run summary.

use crate::models::StrategyKind;
use serde::Serialize;
use tracing::info;

/// Counters aggregated over one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Articles selected for the pass, including those skipped for a missing URL.
    pub total: usize,
    pub lightweight_success: usize,
    pub lightweight_failed: usize,
    pub robust_success: usize,
    pub robust_failed: usize,
    /// Selected articles with no URL.
    pub skipped: usize,
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Count one strategy attempt.
    pub fn record_attempt(&mut self, kind: StrategyKind, success: bool) {
        let counter = match (kind, success) {
            (StrategyKind::Lightweight, true) => &mut self.lightweight_success,
            (StrategyKind::Lightweight, false) => &mut self.lightweight_failed,
            (StrategyKind::Robust, true) => &mut self.robust_success,
            (StrategyKind::Robust, false) => &mut self.robust_failed,
        };
        *counter += 1;
    }

    pub fn succeeded(&self) -> usize {
        self.lightweight_success + self.robust_success
    }

    /// Percentage of selected articles that ended with content, to one decimal place.
    ///
    /// `None` when nothing was selected.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let rate = self.succeeded() as f64 / self.total as f64 * 100.0;
        Some((rate * 10.0).round() / 10.0)
    }

    /// Emit the end-of-run summary.
    pub fn log_summary(&self) {
        match self.success_rate() {
            None => info!("No articles need content; nothing to do"),
            Some(rate) => info!(
                total = self.total,
                lightweight_success = self.lightweight_success,
                lightweight_failed = self.lightweight_failed,
                robust_success = self.robust_success,
                robust_failed = self.robust_failed,
                skipped_no_url = self.skipped,
                success_rate = %format!("{rate:.1}%"),
                "Backfill pass complete"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = RunStats {
            total: 4,
            lightweight_success: 2,
            robust_success: 1,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), Some(75.0));
    }

    #[test]
    fn test_success_rate_rounds_to_one_decimal() {
        let stats = RunStats {
            total: 3,
            lightweight_success: 1,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), Some(33.3));

        let stats = RunStats {
            total: 3,
            lightweight_success: 1,
            robust_success: 1,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), Some(66.7));
    }

    #[test]
    fn test_empty_run_has_no_rate() {
        assert_eq!(RunStats::new(0).success_rate(), None);
    }

    #[test]
    fn test_record_attempt() {
        let mut stats = RunStats::new(2);
        stats.record_attempt(StrategyKind::Lightweight, false);
        stats.record_attempt(StrategyKind::Robust, true);
        stats.record_attempt(StrategyKind::Lightweight, true);

        assert_eq!(stats.lightweight_failed, 1);
        assert_eq!(stats.lightweight_success, 1);
        assert_eq!(stats.robust_success, 1);
        assert_eq!(stats.robust_failed, 0);
        assert_eq!(stats.succeeded(), 2);
    }
}
