//! Published model artifact
//!
//! One JSON document bundling the fitted forest with everything the predictor
//! needs to use it: the feature order it was trained with and the training
//! constants it was derived under.

use crate::estimator::{DurationEstimator, ForestEstimator};
use crate::features::FeatureObservation;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bumped whenever the artifact layout changes incompatibly
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model: ForestEstimator,
    /// Feature order used at training time; prediction vectors replay it
    pub feature_names: Vec<String>,
    pub training_date: DateTime<Utc>,
    pub records_used: usize,
    pub target_moisture: f64,
    pub min_duration: f64,
    pub max_duration: f64,
}

/// Artifact metadata without the model itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub training_date: DateTime<Utc>,
    pub records_used: usize,
    pub target_moisture: f64,
    pub min_duration: f64,
    pub max_duration: f64,
}

impl ModelArtifact {
    /// Serialize for storage
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize a stored artifact, rejecting unknown format versions
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(Error::Model(format!(
                "Unsupported artifact format version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if artifact.feature_names.len() != artifact.model.n_features() {
            return Err(Error::Model(format!(
                "Artifact lists {} feature names but the model takes {}",
                artifact.feature_names.len(),
                artifact.model.n_features()
            )));
        }
        Ok(artifact)
    }

    /// Predict a watering duration, assembling features in the recorded order
    pub fn predict(&self, observation: &FeatureObservation) -> Result<f64> {
        let vector = observation.to_vector(&self.feature_names)?;
        self.model.predict_one(&vector)
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            format_version: self.format_version,
            feature_names: self.feature_names.clone(),
            training_date: self.training_date,
            records_used: self.records_used,
            target_moisture: self.target_moisture,
            min_duration: self.min_duration,
            max_duration: self.max_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::ForestParams;
    use crate::features::default_feature_names;

    fn artifact() -> ModelArtifact {
        let mut features = Vec::new();
        let mut targets = Vec::new();
        for i in 0..12 {
            let m = 25.0 + i as f64 * 2.0;
            features.push(vec![m, 22.0 + i as f64, 60.0 - i as f64, 10.0 + i as f64]);
            targets.push(300.0 - m * 5.0);
        }
        let params = ForestParams {
            n_trees: 5,
            ..ForestParams::default()
        };
        ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            model: ForestEstimator::fit(features, targets, &params).unwrap(),
            feature_names: default_feature_names(),
            training_date: crate::time::now(),
            records_used: 12,
            target_moisture: 50.0,
            min_duration: 5.0,
            max_duration: 600.0,
        }
    }

    #[test]
    fn test_stored_artifact_predicts_identically() {
        let original = artifact();
        let restored = ModelArtifact::from_bytes(&original.to_bytes().unwrap()).unwrap();

        let observation = FeatureObservation {
            temperature: 25.0,
            humidity: 58.0,
            light: 12.0,
            moisture_before: 31.0,
        };
        assert_eq!(
            original.predict(&observation).unwrap(),
            restored.predict(&observation).unwrap()
        );
        assert_eq!(restored.summary(), original.summary());
    }

    #[test]
    fn test_rejects_unknown_format_version() {
        let mut stored = artifact();
        stored.format_version = ARTIFACT_FORMAT_VERSION + 1;
        let bytes = stored.to_bytes().unwrap();
        assert!(matches!(ModelArtifact::from_bytes(&bytes), Err(Error::Model(_))));
    }

    #[test]
    fn test_rejects_feature_count_mismatch() {
        let mut stored = artifact();
        stored.feature_names.pop();
        let bytes = stored.to_bytes().unwrap();
        assert!(matches!(ModelArtifact::from_bytes(&bytes), Err(Error::Model(_))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            ModelArtifact::from_bytes(b"{\"format_version\": 1"),
            Err(Error::Serialization(_))
        ));
    }
}
