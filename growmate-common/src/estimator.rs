//! Random forest regressor wrapper
//!
//! Fitting itself is delegated to smartcore; this module owns the parameter
//! set, the matrix conversion and the error mapping.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    /// Features sampled per split; `None` considers every feature
    pub max_features: Option<usize>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 150,
            max_depth: 7,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
            max_features: None,
        }
    }
}

impl ForestParams {
    fn to_smartcore(&self, n_features: usize) -> RandomForestRegressorParameters {
        let m = self.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));
        RandomForestRegressorParameters::default()
            .with_n_trees(self.n_trees)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_seed(self.seed)
            .with_m(m)
    }
}

/// Anything that maps one feature vector to a watering duration
pub trait DurationEstimator: Send + Sync {
    fn predict_one(&self, features: &[f64]) -> Result<f64>;
}

/// Fitted random forest
#[derive(Serialize, Deserialize)]
pub struct ForestEstimator {
    n_features: usize,
    forest: Forest,
}

impl std::fmt::Debug for ForestEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForestEstimator")
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl ForestEstimator {
    /// Fit a forest on row-major features against targets
    ///
    /// Blocking and CPU heavy; async callers should run it on a blocking thread.
    pub fn fit(features: Vec<Vec<f64>>, targets: Vec<f64>, params: &ForestParams) -> Result<Self> {
        if features.is_empty() {
            return Err(Error::Model("Cannot fit on an empty feature matrix".to_string()));
        }
        if features.len() != targets.len() {
            return Err(Error::Model(format!(
                "Feature rows ({}) and targets ({}) differ in length",
                features.len(),
                targets.len()
            )));
        }

        let n_features = features[0].len();
        if n_features == 0 || features.iter().any(|row| row.len() != n_features) {
            return Err(Error::Model("Feature rows must share a non-zero width".to_string()));
        }

        let x = DenseMatrix::from_2d_vec(&features);
        let forest = RandomForestRegressor::fit(&x, &targets, params.to_smartcore(n_features))
            .map_err(|e| Error::Model(format!("Forest fitting failed: {}", e)))?;

        Ok(Self { n_features, forest })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl DurationEstimator for ForestEstimator {
    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(Error::Model(format!(
                "Expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let x = DenseMatrix::from_2d_vec(&vec![features.to_vec()]);
        let predictions = self
            .forest
            .predict(&x)
            .map_err(|e| Error::Model(format!("Prediction failed: {}", e)))?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| Error::Model("Forest returned no prediction".to_string()))
    }
}
