//! # News Backfill
//!
//! Fills in missing body text for stored news articles by fetching each
//! article's source URL and extracting the readable content.
//!
//! ## Features
//!
//! - Two extraction strategies in cascade: a lightweight HTTP fetch with HTML
//!   parsing, then a headless-browser render for pages that need JavaScript
//! - Per-article, per-strategy outcome persisted as a tri-state so repeated
//!   runs converge: resolved and exhausted articles are never retried
//! - Fixed pause between articles to bound outbound request rate
//! - End-of-run summary and optional JSON run report
//!
//! ## Usage
//!
//! ```sh
//! news_backfill --db-path ./data --db-name news.db
//! ```
//!
//! ## Architecture
//!
//! 1. **Load**: Read every article joined with its extraction record
//! 2. **Select**: Keep articles with a strategy still to try
//! 3. **Cascade**: Per article, try strategies in order until one succeeds,
//!    persisting each attempt
//! 4. **Report**: Log the summary, optionally write JSON
//!
//! Exit status is 0 for a completed pass (including one with nothing to do)
//! and 1 for any fatal error such as losing the database.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod coordinator;
mod models;
mod outputs;
mod selector;
mod stats;
mod store;
mod strategies;
mod utils;

use cli::Cli;
use config::Settings;
use coordinator::ScrapeCoordinator;
use outputs::json::{RunReport, write_report};
use store::SqliteStore;
use strategies::ExtractionStrategy;
use strategies::lightweight::{LightweightConfig, LightweightStrategy};
use strategies::robust::{RobustConfig, RobustStrategy};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let started_at = Utc::now();
    info!("news_backfill starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = match Settings::from_cli(args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Fatal: invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        database = %settings.database_file.display(),
        delay_ms = settings.delay.as_millis() as u64,
        "Configuration loaded"
    );

    // ---- Strategies, cheapest first ----
    let lightweight = LightweightStrategy::new(LightweightConfig {
        timeout: settings.lightweight_timeout,
        user_agent: settings.user_agent.clone(),
    })?;
    let robust = RobustStrategy::new(RobustConfig {
        timeout: settings.robust_timeout,
        chrome_executable: settings.chrome_executable.clone(),
        user_agent: settings.user_agent.clone(),
    });
    let strategies: Vec<Box<dyn ExtractionStrategy>> = vec![Box::new(lightweight), Box::new(robust)];
    let coordinator = ScrapeCoordinator::new(strategies, settings.delay);

    // ---- Pass ----
    let store = match SqliteStore::open(&settings.database_file).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Fatal: could not open article database");
            return Err(e.into());
        }
    };

    let outcome = match store.ensure_schema().await {
        Ok(()) => coordinator.run(&store).await,
        Err(e) => Err(e),
    };
    store.close().await;
    coordinator.shutdown().await;

    let stats = match outcome {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "Fatal: backfill pass aborted");
            return Err(e.into());
        }
    };
    stats.log_summary();

    // ---- Report ----
    if let Some(path) = &settings.report_json {
        let report = RunReport::new(started_at, Utc::now(), stats);
        if let Err(e) = write_report(&report, path).await {
            error!(path = %path.display(), error = %e, "Failed to write run report");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
