//! Model cache
//!
//! Holds the most recently loaded artifact. Requests call [`ModelCache::current`],
//! which re-stats the blob at most once per refresh interval and reloads when
//! its generation changed. [`ModelCache::force_reload`] backs the reload
//! endpoint the trainer calls after publishing.
//!
//! A failed load never evicts the artifact already in memory.

use crate::error::PredictError;
use growmate_common::artifact::ModelArtifact;
use growmate_common::storage::{BlobGeneration, BlobStore};
use growmate_common::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Default)]
struct CacheState {
    artifact: Option<Arc<ModelArtifact>>,
    generation: Option<BlobGeneration>,
    last_check: Option<Instant>,
}

pub struct ModelCache {
    store: Arc<dyn BlobStore>,
    key: String,
    refresh_interval: Duration,
    state: RwLock<CacheState>,
}

impl ModelCache {
    pub fn new(store: Arc<dyn BlobStore>, key: impl Into<String>, refresh_interval: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            refresh_interval,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// First load at startup; a missing artifact is logged, not fatal
    pub async fn load_initial(&self) {
        match self.force_reload().await {
            Ok(artifact) => info!(
                "✓ Loaded model trained {} on {} records",
                artifact.training_date, artifact.records_used
            ),
            Err(e) => warn!("No model loaded at startup: {}", e),
        }
    }

    /// Artifact to serve this request, refreshed first when a check is due
    pub async fn current(&self) -> Result<Arc<ModelArtifact>, PredictError> {
        if self.check_due().await {
            self.refresh_if_changed().await;
        }

        self.state
            .read()
            .await
            .artifact
            .clone()
            .ok_or_else(|| PredictError::ModelUnavailable(format!("{} has not been published", self.key)))
    }

    async fn check_due(&self) -> bool {
        match self.state.read().await.last_check {
            Some(at) => at.elapsed() >= self.refresh_interval,
            None => true,
        }
    }

    /// Reload when the stored generation differs from the cached one
    ///
    /// Returns whether a new artifact was loaded.
    pub async fn refresh_if_changed(&self) -> bool {
        let mut state = self.state.write().await;
        state.last_check = Some(Instant::now());

        let generation = match self.store.stat(&self.key) {
            Ok(Some(generation)) => generation,
            Ok(None) => {
                debug!("{} not present", self.store.describe(&self.key));
                return false;
            }
            Err(e) => {
                warn!("Cannot stat {}: {}", self.store.describe(&self.key), e);
                return false;
            }
        };

        if state.generation == Some(generation) {
            return false;
        }

        match self.load().await {
            Ok(artifact) => {
                info!(
                    "Model changed in storage, reloaded (trained {}, {} records)",
                    artifact.training_date, artifact.records_used
                );
                state.artifact = Some(artifact);
                state.generation = Some(generation);
                true
            }
            Err(e) => {
                warn!("Model reload failed, keeping previous model: {}", e);
                false
            }
        }
    }

    /// Load the stored artifact unconditionally
    pub async fn force_reload(&self) -> Result<Arc<ModelArtifact>, PredictError> {
        let mut state = self.state.write().await;
        state.last_check = Some(Instant::now());

        let generation = self.store.stat(&self.key)?;
        let artifact = self.load().await.map_err(|e| {
            warn!("Model reload failed, keeping previous model: {}", e);
            e
        })?;

        state.artifact = Some(artifact.clone());
        state.generation = generation;
        Ok(artifact)
    }

    async fn load(&self) -> Result<Arc<ModelArtifact>, PredictError> {
        let store = self.store.clone();
        let key = self.key.clone();

        let loaded = tokio::task::spawn_blocking(move || {
            let bytes = store.get(&key)?;
            ModelArtifact::from_bytes(&bytes)
        })
        .await
        .map_err(|e| PredictError::Internal(format!("Model load task failed: {}", e)))?;

        match loaded {
            Ok(artifact) => Ok(Arc::new(artifact)),
            Err(Error::NotFound(what)) => Err(PredictError::ModelUnavailable(what)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use growmate_common::estimator::{ForestEstimator, ForestParams};
    use growmate_common::features::default_feature_names;
    use growmate_common::storage::FsBlobStore;
    use growmate_common::artifact::ARTIFACT_FORMAT_VERSION;
    use tempfile::TempDir;

    const KEY: &str = "optimized_model.json";

    fn artifact_bytes(records_used: usize) -> Vec<u8> {
        let features: Vec<Vec<f64>> = (0..10)
            .map(|i| vec![20.0 + i as f64, 18.0 + i as f64, 70.0 - i as f64, i as f64])
            .collect();
        let targets: Vec<f64> = (0..10).map(|i| 100.0 - i as f64 * 6.0).collect();
        let params = ForestParams {
            n_trees: 3,
            ..ForestParams::default()
        };
        ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            model: ForestEstimator::fit(features, targets, &params).unwrap(),
            feature_names: default_feature_names(),
            training_date: growmate_common::time::now(),
            records_used,
            target_moisture: 50.0,
            min_duration: 5.0,
            max_duration: 600.0,
        }
        .to_bytes()
        .unwrap()
    }

    fn setup(refresh: Duration) -> (TempDir, Arc<FsBlobStore>, ModelCache) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FsBlobStore::open(temp_dir.path(), "models").unwrap());
        let cache = ModelCache::new(store.clone(), KEY, refresh);
        (temp_dir, store, cache)
    }

    #[tokio::test]
    async fn test_missing_artifact_is_unavailable() {
        let (_dir, _store, cache) = setup(Duration::ZERO);
        cache.load_initial().await;
        assert!(matches!(cache.current().await, Err(PredictError::ModelUnavailable(_))));
    }

    #[tokio::test]
    async fn test_picks_up_published_artifact() {
        let (_dir, store, cache) = setup(Duration::ZERO);
        cache.load_initial().await;

        store.put(KEY, &artifact_bytes(7)).unwrap();
        assert_eq!(cache.current().await.unwrap().records_used, 7);

        store.put(KEY, &artifact_bytes(9)).unwrap();
        assert_eq!(cache.current().await.unwrap().records_used, 9);
    }

    #[tokio::test]
    async fn test_unchanged_generation_not_reloaded() {
        let (_dir, store, cache) = setup(Duration::ZERO);
        store.put(KEY, &artifact_bytes(7)).unwrap();
        cache.load_initial().await;

        assert!(!cache.refresh_if_changed().await);
    }

    #[tokio::test]
    async fn test_refresh_throttled_by_interval() {
        let (_dir, store, cache) = setup(Duration::from_secs(3600));
        store.put(KEY, &artifact_bytes(7)).unwrap();
        cache.load_initial().await;

        store.put(KEY, &artifact_bytes(9)).unwrap();
        // Within the interval the cached model keeps serving
        assert_eq!(cache.current().await.unwrap().records_used, 7);

        assert_eq!(cache.force_reload().await.unwrap().records_used, 9);
        assert_eq!(cache.current().await.unwrap().records_used, 9);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_keeps_previous_model() {
        let (_dir, store, cache) = setup(Duration::ZERO);
        store.put(KEY, &artifact_bytes(7)).unwrap();
        cache.load_initial().await;

        store.put(KEY, b"{ not an artifact").unwrap();
        assert!(!cache.refresh_if_changed().await);
        assert!(cache.force_reload().await.is_err());
        assert_eq!(cache.current().await.unwrap().records_used, 7);
    }
}
