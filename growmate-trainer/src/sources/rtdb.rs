//! Realtime database REST client
//!
//! Reads a collection with `GET {base}/{collection}.json`, passing the access
//! token as the `auth` query parameter when one is configured.

use super::{LogSource, SourceError};
use async_trait::async_trait;
use growmate_common::records::RawCollection;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("growmate-trainer/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct RealtimeDbSource {
    http_client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RealtimeDbSource {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}.json", self.base_url, collection.trim_matches('/'))
    }
}

/// Turn a collection payload into id -> record
///
/// The database returns `null` for an absent path and an array when every
/// key is a small integer; array holes come back as `null` and are dropped.
pub fn normalize_collection(collection: &str, payload: Value) -> Result<RawCollection, SourceError> {
    match payload {
        Value::Null => Ok(RawCollection::new()),
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, item)| (index.to_string(), item))
            .collect()),
        other => Err(SourceError::InvalidPayload {
            collection: collection.to_string(),
            reason: format!("expected an object, got {}", other),
        }),
    }
}

#[async_trait]
impl LogSource for RealtimeDbSource {
    async fn fetch_collection(&self, collection: &str) -> Result<RawCollection, SourceError> {
        let url = self.collection_url(collection);
        debug!("Fetching {}", url);

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http(format!(
                "{} returned {}: {}",
                collection, status, body
            )));
        }

        let payload: Value = response.json().await.map_err(|e| SourceError::InvalidPayload {
            collection: collection.to_string(),
            reason: e.to_string(),
        })?;

        normalize_collection(collection, payload)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
