//! Feature vector contract
//!
//! Training and prediction both build feature vectors through
//! [`FeatureObservation::to_vector`], driven by a list of feature names. The
//! trainer records the list it used in the artifact and the predictor replays
//! that list, so vector order can never drift between the two.

use crate::records::{RecordError, SensorLog};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical feature order used when fitting a new model
pub const FEATURE_NAMES: [&str; 4] = ["moisture_before", "temperature", "humidity", "light"];

/// Owned copy of [`FEATURE_NAMES`], as stored in an artifact
pub fn default_feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

/// One set of model inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureObservation {
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
    pub moisture_before: f64,
}

impl FeatureObservation {
    /// Parse a prediction payload (numbers or numeric strings)
    pub fn from_payload(payload: &Value) -> std::result::Result<Self, RecordError> {
        SensorLog::from_raw(payload).map(Self::from)
    }

    /// Look up a single feature by name
    pub fn value_of(&self, name: &str) -> Option<f64> {
        match name {
            "moisture_before" => Some(self.moisture_before),
            "temperature" => Some(self.temperature),
            "humidity" => Some(self.humidity),
            "light" => Some(self.light),
            _ => None,
        }
    }

    /// Assemble a feature vector in the given order
    ///
    /// Fails on a name this observation does not carry, which means the
    /// artifact was trained on a different feature set.
    pub fn to_vector<S: AsRef<str>>(&self, feature_names: &[S]) -> Result<Vec<f64>> {
        feature_names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.value_of(name)
                    .ok_or_else(|| Error::Model(format!("Unknown feature in model: {}", name)))
            })
            .collect()
    }
}

impl From<SensorLog> for FeatureObservation {
    fn from(log: SensorLog) -> Self {
        Self {
            temperature: log.temperature,
            humidity: log.humidity,
            light: log.light,
            moisture_before: log.moisture_before,
        }
    }
}
