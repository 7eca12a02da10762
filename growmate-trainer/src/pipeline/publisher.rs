//! Model publishing
//!
//! Bundles a fitted model with its training metadata and writes it to blob
//! storage under the well-known artifact key. The blob store's atomic replace
//! guarantees the predictor never reads a half-written artifact.

use super::calculator::DurationPolicy;
use super::trainer::TrainedModel;
use crate::error::PipelineError;
use growmate_common::artifact::{ArtifactSummary, ModelArtifact, ARTIFACT_FORMAT_VERSION};
use growmate_common::storage::{BlobMeta, BlobStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// What a successful publish produced
#[derive(Debug, Clone)]
pub struct PublishedArtifact {
    pub blob: BlobMeta,
    pub summary: ArtifactSummary,
}

pub struct Publisher {
    store: Arc<dyn BlobStore>,
    artifact_key: String,
}

impl Publisher {
    pub fn new(store: Arc<dyn BlobStore>, artifact_key: impl Into<String>) -> Self {
        Self {
            store,
            artifact_key: artifact_key.into(),
        }
    }

    /// Serialize and store the artifact, replacing the previous one
    pub fn publish(
        &self,
        model: TrainedModel,
        records_used: usize,
        policy: &DurationPolicy,
    ) -> Result<PublishedArtifact, PipelineError> {
        let artifact = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            model: model.estimator,
            feature_names: model.feature_names,
            training_date: growmate_common::time::now(),
            records_used,
            target_moisture: policy.target_moisture,
            min_duration: policy.min_duration,
            max_duration: policy.max_duration,
        };

        let bytes = artifact.to_bytes()?;
        let blob = self.store.put(&self.artifact_key, &bytes)?;

        info!(
            records_used,
            size = blob.size,
            sha256 = %blob.sha256,
            "Model saved to {}",
            self.store.describe(&self.artifact_key)
        );

        Ok(PublishedArtifact {
            blob,
            summary: artifact.summary(),
        })
    }
}

/// Tells a running predictor to pick up the new artifact right away
pub struct ReloadNotifier {
    http_client: reqwest::Client,
    url: String,
}

impl ReloadNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, PipelineError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::Internal(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    /// POST to the reload endpoint; failures are logged, never propagated
    pub async fn notify(&self) -> bool {
        match self.http_client.post(&self.url).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Predictor reloaded model via {}", self.url);
                true
            }
            Ok(response) => {
                warn!("Predictor reload at {} returned {}", self.url, response.status());
                false
            }
            Err(e) => {
                warn!("Could not reach predictor reload endpoint {}: {}", self.url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use growmate_common::estimator::{ForestEstimator, ForestParams};
    use growmate_common::features::default_feature_names;
    use growmate_common::storage::FsBlobStore;
    use tempfile::TempDir;

    fn trained_model() -> TrainedModel {
        let features: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![25.0 + i as f64, 18.0 + i as f64, 70.0 - i as f64, i as f64 * 2.0])
            .collect();
        let targets: Vec<f64> = (0..10).map(|i| 80.0 - i as f64 * 5.0).collect();
        let params = ForestParams {
            n_trees: 3,
            ..ForestParams::default()
        };
        TrainedModel {
            estimator: ForestEstimator::fit(features, targets, &params).unwrap(),
            feature_names: default_feature_names(),
        }
    }

    #[test]
    fn test_publish_writes_readable_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FsBlobStore::open(temp_dir.path(), "models").unwrap());
        let publisher = Publisher::new(store.clone(), "optimized_model.json");

        let published = publisher
            .publish(trained_model(), 10, &DurationPolicy::default())
            .unwrap();
        assert_eq!(published.summary.records_used, 10);
        assert_eq!(published.summary.target_moisture, 50.0);
        assert_eq!(published.summary.min_duration, 5.0);
        assert_eq!(published.summary.max_duration, 600.0);

        let stored = ModelArtifact::from_bytes(&store.get("optimized_model.json").unwrap()).unwrap();
        assert_eq!(stored.summary(), published.summary);
        assert_eq!(stored.feature_names, default_feature_names());
    }

    #[test]
    fn test_republish_supersedes_previous_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FsBlobStore::open(temp_dir.path(), "models").unwrap());
        let publisher = Publisher::new(store.clone(), "optimized_model.json");

        let first = publisher
            .publish(trained_model(), 10, &DurationPolicy::default())
            .unwrap();
        let second = publisher
            .publish(trained_model(), 12, &DurationPolicy::default())
            .unwrap();
        assert_ne!(first.blob.generation, second.blob.generation);

        let stored = ModelArtifact::from_bytes(&store.get("optimized_model.json").unwrap()).unwrap();
        assert_eq!(stored.records_used, 12);
    }

    #[tokio::test]
    async fn test_notify_unreachable_is_not_fatal() {
        let notifier = ReloadNotifier::new("http://127.0.0.1:9/model/reload").unwrap();
        assert!(!notifier.notify().await);
    }
}
