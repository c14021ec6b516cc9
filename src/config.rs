//! Runtime configuration.
//!
//! Settings come from three layers, highest precedence first:
//! 1. Command-line flags and their environment variables ([`Cli`])
//! 2. An optional YAML file ([`FileConfig`])
//! 3. Built-in defaults
//!
//! The database location and name have no default.
//!
//! # Example file
//!
//! ```yaml
//! database:
//!   path: /var/lib/news
//!   name: articles.db
//! delay_ms: 1000
//! lightweight_timeout_secs: 15
//! robust_timeout_secs: 30
//! chrome_executable: /usr/bin/chromium
//! report_json: /var/log/news/backfill.json
//! ```

use crate::cli::Cli;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; news_backfill/0.1)";
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_LIGHTWEIGHT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_ROBUST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("database {0} is not configured (use --{0}, the matching env var, or the config file)")]
    MissingDatabase(&'static str),
}

/// Database section of the YAML file.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct DatabaseSection {
    pub path: Option<PathBuf>,
    pub name: Option<String>,
}

/// The YAML config file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    pub delay_ms: Option<u64>,
    pub lightweight_timeout_secs: Option<u64>,
    pub robust_timeout_secs: Option<u64>,
    pub chrome_executable: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub report_json: Option<PathBuf>,
}

impl FileConfig {
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is a valid, empty config.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_file: PathBuf,
    pub delay: Duration,
    pub lightweight_timeout: Duration,
    pub robust_timeout: Duration,
    pub chrome_executable: Option<PathBuf>,
    pub user_agent: String,
    pub report_json: Option<PathBuf>,
}

impl Settings {
    /// Load the config file named by the CLI, if any, and merge.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let db_path = cli
            .db_path
            .or(file.database.path)
            .ok_or(ConfigError::MissingDatabase("db-path"))?;
        let db_name = cli
            .db_name
            .or(file.database.name)
            .filter(|name| !name.trim().is_empty())
            .ok_or(ConfigError::MissingDatabase("db-name"))?;

        let settings = Self {
            database_file: db_path.join(db_name),
            delay: Duration::from_millis(cli.delay_ms.or(file.delay_ms).unwrap_or(DEFAULT_DELAY_MS)),
            lightweight_timeout: Duration::from_secs(
                cli.lightweight_timeout_secs
                    .or(file.lightweight_timeout_secs)
                    .unwrap_or(DEFAULT_LIGHTWEIGHT_TIMEOUT_SECS),
            ),
            robust_timeout: Duration::from_secs(
                cli.robust_timeout_secs
                    .or(file.robust_timeout_secs)
                    .unwrap_or(DEFAULT_ROBUST_TIMEOUT_SECS),
            ),
            chrome_executable: cli.chrome_executable.or(file.chrome_executable),
            user_agent: file.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            report_json: cli.report_json.or(file.report_json),
        };
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["news_backfill"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
database:
  path: /var/lib/news
  name: articles.db
delay_ms: 500
lightweight_timeout_secs: 10
robust_timeout_secs: 45
report_json: /tmp/report.json
"#;
        let file = FileConfig::from_yaml(yaml).unwrap();
        assert_eq!(file.database.path, Some(PathBuf::from("/var/lib/news")));
        assert_eq!(file.database.name.as_deref(), Some("articles.db"));
        assert_eq!(file.delay_ms, Some(500));
        assert_eq!(file.robust_timeout_secs, Some(45));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(FileConfig::from_yaml("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(FileConfig::from_yaml("delay: 5\n").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig {
            database: DatabaseSection {
                path: Some(PathBuf::from("/from/file")),
                name: Some("file.db".to_string()),
            },
            delay_ms: Some(2000),
            ..Default::default()
        };
        let settings = Settings::resolve(
            cli(&["--db-path", "/from/cli", "--db-name", "cli.db", "--delay-ms", "0"]),
            file,
        )
        .unwrap();

        assert_eq!(settings.database_file, PathBuf::from("/from/cli/cli.db"));
        assert_eq!(settings.delay, Duration::ZERO);
    }

    #[test]
    fn test_defaults_apply() {
        let settings = Settings::resolve(cli(&["--db-path", "/data", "--db-name", "news.db"]), FileConfig::default())
            .unwrap();

        assert_eq!(settings.delay, Duration::from_millis(DEFAULT_DELAY_MS));
        assert_eq!(settings.lightweight_timeout, Duration::from_secs(15));
        assert_eq!(settings.robust_timeout, Duration::from_secs(30));
        assert_eq!(settings.user_agent, DEFAULT_USER_AGENT);
        assert!(settings.report_json.is_none());
    }

    #[test]
    fn test_missing_database_name_is_an_error() {
        let file = FileConfig {
            database: DatabaseSection {
                path: Some(PathBuf::from("/data")),
                name: Some("  ".to_string()),
            },
            ..Default::default()
        };
        // Built directly so DB_NAME in the test environment cannot fill the gap.
        let cli = Cli {
            db_path: Some(PathBuf::from("/data")),
            db_name: None,
            config: None,
            delay_ms: None,
            lightweight_timeout_secs: None,
            robust_timeout_secs: None,
            chrome_executable: None,
            report_json: None,
        };
        let err = Settings::resolve(cli, file);
        assert!(matches!(err, Err(ConfigError::MissingDatabase("db-name"))));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backfill.yaml");
        std::fs::write(&path, "database:\n  path: /srv\n  name: news.db\n").unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.database.name.as_deref(), Some("news.db"));

        assert!(matches!(
            FileConfig::load(&tmp.path().join("missing.yaml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
