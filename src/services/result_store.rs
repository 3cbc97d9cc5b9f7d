use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::AnalysisRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Could not encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn error_code(&self) -> &'static str {
        "STORAGE_FAILED"
    }
}

/// Audit sink for analysis summaries. Nothing in the request path reads
/// records back.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(&self, record: &AnalysisRecord) -> Result<(), StoreError>;

    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Records an analysis without letting the outcome reach the caller. The
/// write runs as its own task so that neither an error nor a panic in the
/// store can unwind into the response path.
pub async fn persist_best_effort(store: Arc<dyn ResultStore>, record: AnalysisRecord) {
    let score = record.score;
    let write = tokio::spawn(async move { store.save(&record).await });

    match write.await {
        Ok(Ok(())) => debug!(score = score, "Analysis record saved"),
        Ok(Err(e)) => error!(
            error_code = e.error_code(),
            error = %e,
            "Database save failed (non-fatal)"
        ),
        Err(e) => error!(
            error_code = "STORAGE_FAILED",
            error = %e,
            "Database save task aborted (non-fatal)"
        ),
    }
}

pub struct SqliteResultStore {
    pool: SqlitePool,
}

impl SqliteResultStore {
    /// Opens the database and creates the `analyses` table if needed.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        info!("Database connection established");

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_role TEXT NOT NULL,
                score INTEGER NOT NULL,
                missing_keywords TEXT NOT NULL DEFAULT '[]',
                date TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_date ON analyses(date);")
            .execute(&self.pool)
            .await?;

        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn save(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        let missing_keywords = serde_json::to_string(&record.missing_keywords)?;

        sqlx::query(
            "INSERT INTO analyses (job_role, score, missing_keywords, date) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.job_role)
        .bind(record.score)
        .bind(missing_keywords)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Stand-in used when the database could not be opened at startup: the
/// service keeps answering and every write is reported as failed.
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ResultStore for UnavailableStore {
    async fn save(&self, _record: &AnalysisRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(self.reason.clone()))
    }

    async fn is_healthy(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(score: i64, keywords: &[&str]) -> AnalysisRecord {
        AnalysisRecord {
            job_role: "Extracted from JD".to_string(),
            score,
            missing_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_store_persists_records() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("analyses.db").display());
        let store = SqliteResultStore::connect(&url).await.unwrap();

        store.save(&record(72, &["Kubernetes", "gRPC"])).await.unwrap();
        store.save(&record(35, &[])).await.unwrap();

        let rows: Vec<(String, i64, String)> =
            sqlx::query_as("SELECT job_role, score, missing_keywords FROM analyses ORDER BY id")
                .fetch_all(store.pool())
                .await
                .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "Extracted from JD");
        assert_eq!(rows[0].1, 72);
        let keywords: Vec<String> = serde_json::from_str(&rows[0].2).unwrap();
        assert_eq!(keywords, vec!["Kubernetes", "gRPC"]);
        assert_eq!(rows[1].2, "[]");
        assert!(store.is_healthy().await);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("analyses.db").display());

        SqliteResultStore::connect(&url).await.unwrap();
        let reopened = SqliteResultStore::connect(&url).await.unwrap();
        reopened.save(&record(90, &["Rust"])).await.unwrap();
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_write() {
        let store = UnavailableStore::new("connection refused");
        let err = store.save(&record(50, &[])).await.unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_FAILED");
        assert!(err.to_string().contains("connection refused"));
        assert!(!store.is_healthy().await);
    }

    struct PanickingStore;

    #[async_trait]
    impl ResultStore for PanickingStore {
        async fn save(&self, _record: &AnalysisRecord) -> Result<(), StoreError> {
            panic!("driver bug");
        }
    }

    #[tokio::test]
    async fn test_best_effort_write_contains_failures() {
        persist_best_effort(Arc::new(UnavailableStore::new("down")), record(10, &[])).await;
        persist_best_effort(Arc::new(PanickingStore), record(10, &[])).await;
    }
}
