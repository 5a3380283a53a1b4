use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::error::Result;
use crate::model::Article;

/// Key under which the saved-articles snapshot is persisted.
pub const SAVED_ARTICLES_KEY: &str = "savedArticles";

/// Local persisted copy of the saved articles, read and written as a whole.
#[async_trait]
pub trait LocalFallbackStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Article>>;
    async fn store(&self, articles: &[Article]) -> Result<()>;
}

pub struct SqliteSnapshot {
    pool: SqlitePool,
}

impl SqliteSnapshot {
    pub async fn new(database_url: &str) -> Result<Self> {
        // One writer; the snapshot is replaced whole on every store.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn updated_at(&self) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT updated_at FROM snapshots WHERE key = ?")
                .bind(SAVED_ARTICLES_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }
}

#[async_trait]
impl LocalFallbackStore for SqliteSnapshot {
    async fn load(&self) -> Result<Vec<Article>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM snapshots WHERE key = ?")
            .bind(SAVED_ARTICLES_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((value,)) => Ok(serde_json::from_str(&value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn store(&self, articles: &[Article]) -> Result<()> {
        let value = serde_json::to_string(articles)?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO snapshots (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(SAVED_ARTICLES_KEY)
        .bind(&value)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Snapshot held in process memory. Lost on exit.
#[derive(Default)]
pub struct MemorySnapshot {
    articles: Mutex<Vec<Article>>,
}

impl MemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: Mutex::new(articles),
        }
    }
}

#[async_trait]
impl LocalFallbackStore for MemorySnapshot {
    async fn load(&self) -> Result<Vec<Article>> {
        let articles = self
            .articles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(articles.clone())
    }

    async fn store(&self, articles: &[Article]) -> Result<()> {
        let mut stored = self
            .articles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *stored = articles.to_vec();
        Ok(())
    }
}
