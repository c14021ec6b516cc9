//! JSON run report.
//!
//! # Output Structure
//!
//! ```json
//! {
//!   "started_at": "2025-05-06T08:00:00Z",
//!   "finished_at": "2025-05-06T08:03:12Z",
//!   "duration_ms": 192000,
//!   "stats": { "total": 4, "lightweight_success": 2, ... },
//!   "success_rate": 75.0
//! }
//! ```
//!
//! `success_rate` is `null` when no article needed work.

use crate::stats::RunStats;
use crate::utils::ensure_writable_parent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Everything recorded about one completed pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub stats: RunStats,
    pub success_rate: Option<f64>,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, finished_at: DateTime<Utc>, stats: RunStats) -> Self {
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            started_at,
            finished_at,
            duration_ms,
            stats,
            success_rate: stats.success_rate(),
        }
    }
}

/// Write `report` as pretty JSON to `path`, creating the parent directory.
///
/// # Arguments
///
/// * `report` - The finished run report
/// * `path` - Destination file; an existing file is overwritten
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created or is not writable
/// - Serialization or the file write fails
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(report: &RunReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    ensure_writable_parent(path).await?;
    fs::write(path, json).await?;
    info!("Wrote run report");
    Ok(())
}
