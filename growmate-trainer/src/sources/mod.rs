//! Log sources
//!
//! A log source hands back whole collections of raw records keyed by id. Two
//! backends exist, chosen by the database URL scheme:
//! - `sqlite:` a local SQLite store ([`SqliteLogStore`])
//! - `http(s)://` a realtime database REST endpoint ([`RealtimeDbSource`])

use async_trait::async_trait;
use growmate_common::config::DatabaseConfig;
use growmate_common::records::RawCollection;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

mod rtdb;
mod sqlite;

pub use rtdb::RealtimeDbSource;
pub use sqlite::SqliteLogStore;

/// Log source failures (database connectivity, bad responses)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unexpected payload for collection '{collection}': {reason}")]
    InvalidPayload { collection: String, reason: String },

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch every record of a collection; an absent collection is empty
    async fn fetch_collection(&self, collection: &str) -> Result<RawCollection, SourceError>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Both collections as read at the start of a training run
#[derive(Debug, Clone, Default)]
pub struct LogSnapshot {
    pub sensor_collection: String,
    pub sensor_logs: RawCollection,
    pub outcome_collection: String,
    pub outcome_logs: RawCollection,
}

impl LogSnapshot {
    pub fn is_empty(&self) -> bool {
        self.sensor_logs.is_empty() && self.outcome_logs.is_empty()
    }
}

/// Read the sensor and outcome collections named in the config
pub async fn fetch_snapshot(
    source: &dyn LogSource,
    db: &DatabaseConfig,
) -> Result<LogSnapshot, SourceError> {
    let sensor_logs = source.fetch_collection(&db.sensor_collection).await?;
    let outcome_logs = source.fetch_collection(&db.outcome_collection).await?;

    info!(
        sensor_logs = sensor_logs.len(),
        outcome_logs = outcome_logs.len(),
        "Fetched logs from {}",
        source.describe()
    );

    Ok(LogSnapshot {
        sensor_collection: db.sensor_collection.clone(),
        sensor_logs,
        outcome_collection: db.outcome_collection.clone(),
        outcome_logs,
    })
}

/// Open the log source a database URL points at
pub async fn open_source(
    url: &str,
    credential: Option<String>,
) -> Result<Arc<dyn LogSource>, SourceError> {
    if url.starts_with("sqlite:") {
        let store = SqliteLogStore::open(url).await?;
        Ok(Arc::new(store))
    } else if url.starts_with("http://") || url.starts_with("https://") {
        let source = RealtimeDbSource::new(url, credential)?;
        Ok(Arc::new(source))
    } else {
        Err(SourceError::UnsupportedUrl(url.to_string()))
    }
}
