//! SQLite-backed log store
//!
//! All collections share one table; each row is a record id plus its JSON body.

use super::{LogSource, SourceError};
use async_trait::async_trait;
use growmate_common::records::RawCollection;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SqliteLogStore {
    pool: SqlitePool,
    url: String,
}

impl SqliteLogStore {
    /// Open (creating if missing) the store at a `sqlite:` URL
    pub async fn open(url: &str) -> Result<Self, SourceError> {
        let in_memory = url.contains(":memory:");

        if !in_memory {
            if let Some(parent) = database_file(url).and_then(|p| p.parent().map(|p| p.to_path_buf())) {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(&parent).map_err(|e| {
                        SourceError::Database(sqlx::Error::Io(e))
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(5000));

        // An in-memory database lives and dies with its single connection
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        if !in_memory {
            sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        }

        create_log_records_table(&pool).await?;
        info!("Opened log store: {}", url);

        Ok(Self {
            pool,
            url: url.to_string(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Store a record under an explicit id, replacing any previous body
    pub async fn insert(
        &self,
        collection: &str,
        record_id: &str,
        body: &Value,
    ) -> Result<(), SourceError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO log_records (collection, record_id, body)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(collection)
        .bind(record_id)
        .bind(body.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append a record under a generated id and return that id
    pub async fn append(&self, collection: &str, body: &Value) -> Result<String, SourceError> {
        let record_id = uuid::Uuid::new_v4().to_string();
        self.insert(collection, &record_id, body).await?;
        Ok(record_id)
    }
}

async fn create_log_records_table(pool: &SqlitePool) -> Result<(), SourceError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS log_records (
            collection TEXT NOT NULL,
            record_id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (collection, record_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// File path portion of a `sqlite:` URL
fn database_file(url: &str) -> Option<std::path::PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        None
    } else {
        Some(std::path::PathBuf::from(path))
    }
}

#[async_trait]
impl LogSource for SqliteLogStore {
    async fn fetch_collection(&self, collection: &str) -> Result<RawCollection, SourceError> {
        let rows = sqlx::query("SELECT record_id, body FROM log_records WHERE collection = ?")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        let mut records = RawCollection::new();
        for row in rows {
            let record_id: String = row.try_get("record_id")?;
            let body: String = row.try_get("body")?;
            // Unparseable bodies are passed on as strings; reconciliation skips them
            let value = serde_json::from_str(&body).unwrap_or_else(|e| {
                warn!("Record {} in {} holds invalid JSON: {}", record_id, collection, e);
                Value::String(body)
            });
            records.insert(record_id, value);
        }

        Ok(records)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
