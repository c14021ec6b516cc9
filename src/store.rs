//! Durable extraction records.
//!
//! [`StatusStore`] is the minimal set of operations the coordinator needs;
//! [`SqliteStore`] implements it on top of an `sqlx` SQLite pool.
//!
//! # Schema
//!
//! ```text
//! articles          (id, url, title, author, created_at)
//! article_contents  (id, article_id -> articles.id, content,
//!                    lightweight_status, robust_status, created_at, updated_at)
//! ```
//!
//! Strategy statuses are nullable INTEGER columns (`NULL` not attempted,
//! `1` succeeded, `0` failed). Conversion to [`ExtractionStatus`] happens
//! only in this module.
//!
//! Every error here is fatal to the run.

use crate::models::{Article, ExtractionRecord, ExtractionStatus, RecordUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("no extraction record found for article {0} after creating it")]
    MissingRecord(i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence operations consumed by the coordinator.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Every article in enumeration order, each joined with its record if one exists.
    async fn list_articles_with_records(&self) -> Result<Vec<(Article, Option<ExtractionRecord>)>>;

    /// Create the record for an article's first attempt.
    async fn create_record(
        &self,
        article_id: i64,
        content: &str,
        lightweight_status: ExtractionStatus,
        robust_status: ExtractionStatus,
    ) -> Result<()>;

    /// Write the supplied fields of `update` to `record`.
    async fn update_record(&self, record: &ExtractionRecord, update: &RecordUpdate) -> Result<()>;

    async fn find_record_by_article_id(&self, article_id: i64) -> Result<Option<ExtractionRecord>>;
}

/// SQLite-backed [`StatusStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) the database file at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - The SQLite file, resolved from the database location and name
    ///
    /// # Returns
    ///
    /// A store over a single-connection pool with foreign keys enabled. Call
    /// [`SqliteStore::ensure_schema`] before use and [`SqliteStore::close`] when done.
    ///
    /// # Errors
    ///
    /// [`StoreError::Database`] if the file cannot be opened or created.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!("Opened article database");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[cfg(test)]
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create the tables if they are missing. Existing tables are left alone.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT,
                title TEXT,
                author TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS article_contents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL REFERENCES articles(id),
                content TEXT NOT NULL DEFAULT '',
                lightweight_status INTEGER,
                robust_status INTEGER,
                created_at TIMESTAMP,
                updated_at TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_article_contents_article_id ON article_contents(article_id)",
        )
        .execute(&self.pool)
        .await?;

        debug!("Schema ready");
        Ok(())
    }

    /// Release the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed article database");
    }
}

fn record_from_row(row: &SqliteRow) -> std::result::Result<ExtractionRecord, sqlx::Error> {
    Ok(ExtractionRecord {
        id: row.try_get("record_id")?,
        article_id: row.try_get("article_id")?,
        content: row.try_get::<Option<String>, _>("content")?.unwrap_or_default(),
        lightweight_status: ExtractionStatus::from_stored(row.try_get("lightweight_status")?),
        robust_status: ExtractionStatus::from_stored(row.try_get("robust_status")?),
        created_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}

#[async_trait]
impl StatusStore for SqliteStore {
    async fn list_articles_with_records(&self) -> Result<Vec<(Article, Option<ExtractionRecord>)>> {
        // An article only ever joins its earliest record.
        let rows = sqlx::query(
            r#"
            SELECT a.id AS id, a.url AS url, a.title AS title, a.author AS author,
                   c.id AS record_id, c.article_id AS article_id, c.content AS content,
                   c.lightweight_status AS lightweight_status, c.robust_status AS robust_status,
                   c.created_at AS created_at, c.updated_at AS updated_at
            FROM articles a
            LEFT JOIN article_contents c
              ON c.id = (SELECT MIN(c2.id) FROM article_contents c2 WHERE c2.article_id = a.id)
            ORDER BY a.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut population = Vec::with_capacity(rows.len());
        for row in &rows {
            let article = Article {
                id: row.try_get("id")?,
                url: row.try_get("url")?,
                title: row.try_get("title")?,
                author: row.try_get("author")?,
            };
            let record = match row.try_get::<Option<i64>, _>("record_id")? {
                Some(_) => Some(record_from_row(row)?),
                None => None,
            };
            population.push((article, record));
        }

        debug!(count = population.len(), "Loaded article population");
        Ok(population)
    }

    async fn create_record(
        &self,
        article_id: i64,
        content: &str,
        lightweight_status: ExtractionStatus,
        robust_status: ExtractionStatus,
    ) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO article_contents
                (article_id, content, lightweight_status, robust_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(article_id)
        .bind(content)
        .bind(lightweight_status.to_stored())
        .bind(robust_status.to_stored())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(article_id, %lightweight_status, %robust_status, "Created extraction record");
        Ok(())
    }

    async fn update_record(&self, record: &ExtractionRecord, update: &RecordUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE article_contents SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(content) = &update.content {
                fields.push("content = ").push_bind_unseparated(content.clone());
            }
            if let Some(status) = update.lightweight_status {
                fields.push("lightweight_status = ").push_bind_unseparated(status.to_stored());
            }
            if let Some(status) = update.robust_status {
                fields.push("robust_status = ").push_bind_unseparated(status.to_stored());
            }
            fields.push("updated_at = ").push_bind_unseparated(Utc::now());
        }
        builder.push(" WHERE id = ").push_bind(record.id);
        builder.build().execute(&self.pool).await?;

        debug!(record_id = record.id, article_id = record.article_id, "Updated extraction record");
        Ok(())
    }

    async fn find_record_by_article_id(&self, article_id: i64) -> Result<Option<ExtractionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id AS record_id, article_id, content, lightweight_status, robust_status,
                   created_at, updated_at
            FROM article_contents
            WHERE article_id = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(record_from_row(&row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteStore::from_pool(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    pub(crate) async fn insert_article(store: &SqliteStore, url: Option<&str>) -> i64 {
        sqlx::query("INSERT INTO articles (url, title) VALUES (?, ?)")
            .bind(url)
            .bind("A headline")
            .execute(store.pool())
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_list_left_join() {
        let store = memory_store().await;
        let a = insert_article(&store, Some("https://news.example/a")).await;
        let b = insert_article(&store, None).await;
        store
            .create_record(a, "", ExtractionStatus::Failed, ExtractionStatus::NotAttempted)
            .await
            .unwrap();

        let population = store.list_articles_with_records().await.unwrap();
        assert_eq!(population.len(), 2);

        let (article_a, record_a) = &population[0];
        assert_eq!(article_a.id, a);
        assert_eq!(article_a.url.as_deref(), Some("https://news.example/a"));
        let record_a = record_a.as_ref().unwrap();
        assert_eq!(record_a.lightweight_status, ExtractionStatus::Failed);
        assert_eq!(record_a.robust_status, ExtractionStatus::NotAttempted);
        assert_eq!(record_a.content, "");

        let (article_b, record_b) = &population[1];
        assert_eq!(article_b.id, b);
        assert!(article_b.url.is_none());
        assert!(record_b.is_none());
    }

    #[tokio::test]
    async fn test_tri_state_stored_as_nullable_boolean() {
        let store = memory_store().await;
        let a = insert_article(&store, Some("https://news.example/a")).await;
        store
            .create_record(a, "text", ExtractionStatus::Succeeded, ExtractionStatus::NotAttempted)
            .await
            .unwrap();

        let (lightweight, robust): (Option<bool>, Option<bool>) = sqlx::query_as(
            "SELECT lightweight_status, robust_status FROM article_contents WHERE article_id = ?",
        )
        .bind(a)
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(lightweight, Some(true));
        assert_eq!(robust, None);
    }

    #[tokio::test]
    async fn test_partial_update() {
        let store = memory_store().await;
        let a = insert_article(&store, Some("https://news.example/a")).await;
        store
            .create_record(a, "", ExtractionStatus::Failed, ExtractionStatus::NotAttempted)
            .await
            .unwrap();
        let record = store.find_record_by_article_id(a).await.unwrap().unwrap();

        let update = RecordUpdate {
            robust_status: Some(ExtractionStatus::Succeeded),
            content: Some("rendered text".to_string()),
            ..Default::default()
        };
        store.update_record(&record, &update).await.unwrap();

        let updated = store.find_record_by_article_id(a).await.unwrap().unwrap();
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.content, "rendered text");
        assert_eq!(updated.lightweight_status, ExtractionStatus::Failed);
        assert_eq!(updated.robust_status, ExtractionStatus::Succeeded);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_find_missing_record() {
        let store = memory_store().await;
        let a = insert_article(&store, Some("https://news.example/a")).await;
        assert!(store.find_record_by_article_id(a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_only_first_record_is_joined() {
        let store = memory_store().await;
        let a = insert_article(&store, Some("https://news.example/a")).await;
        store
            .create_record(a, "", ExtractionStatus::Failed, ExtractionStatus::Failed)
            .await
            .unwrap();
        store
            .create_record(a, "later", ExtractionStatus::Succeeded, ExtractionStatus::NotAttempted)
            .await
            .unwrap();

        let population = store.list_articles_with_records().await.unwrap();
        assert_eq!(population.len(), 1);
        let record = population[0].1.as_ref().unwrap();
        assert_eq!(record.lightweight_status, ExtractionStatus::Failed);
        assert_eq!(record.content, "");
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("news.db");
        let store = SqliteStore::open(&path).await.unwrap();
        store.ensure_schema().await.unwrap();
        store.ensure_schema().await.unwrap();
        store.close().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_closed_pool_is_an_error() {
        let store = memory_store().await;
        store.close().await;
        assert!(matches!(
            store.list_articles_with_records().await,
            Err(StoreError::Database(_))
        ));
    }
}
