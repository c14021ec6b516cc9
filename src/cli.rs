//! Command-line interface definitions for the article backfill.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most options can also be supplied through environment variables, and any
//! option left unset falls back to the YAML config file, then to defaults.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the backfill run.
///
/// # Examples
///
/// ```sh
/// # Database location and name from the environment
/// DB_PATH=/var/lib/news DB_NAME=articles.db news_backfill
///
/// # Everything on the command line, with a JSON run report
/// news_backfill --db-path ./data --db-name news.db --report-json ./reports/last_run.json
///
/// # Settings from a YAML file
/// news_backfill -c ./backfill.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding the article database
    #[arg(long, env = "DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// File name of the article database inside the database directory
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pause between articles, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Timeout for the lightweight HTTP fetch, in seconds
    #[arg(long)]
    pub lightweight_timeout_secs: Option<u64>,

    /// Timeout for the headless browser render, in seconds
    #[arg(long)]
    pub robust_timeout_secs: Option<u64>,

    /// Path to a Chromium/Chrome binary for the robust strategy
    #[arg(long, env = "CHROME_EXECUTABLE")]
    pub chrome_executable: Option<PathBuf>,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    pub report_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "news_backfill",
            "--db-path",
            "./data",
            "--db-name",
            "news.db",
            "--delay-ms",
            "250",
        ]);

        assert_eq!(cli.db_path, Some(PathBuf::from("./data")));
        assert_eq!(cli.db_name.as_deref(), Some("news.db"));
        assert_eq!(cli.delay_ms, Some(250));
        assert!(cli.report_json.is_none());
    }

    #[test]
    fn test_cli_short_config_flag() {
        let cli = Cli::parse_from(["news_backfill", "-c", "/etc/backfill.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/backfill.yaml")));
    }

    #[test]
    fn test_cli_rejects_bad_number() {
        assert!(Cli::try_parse_from(["news_backfill", "--delay-ms", "soon"]).is_err());
    }
}
