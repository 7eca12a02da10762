//! Model fitting
//!
//! Features are assembled through `FeatureObservation::to_vector` with the
//! canonical feature list; that same list travels with the fitted model so the
//! predictor can rebuild vectors in identical order.

use super::calculator::TrainingRow;
use crate::error::PipelineError;
use growmate_common::config::TrainingConfig;
use growmate_common::estimator::ForestEstimator;
use growmate_common::features::{default_feature_names, FeatureObservation};
use tracing::info;

/// Fitted estimator plus the feature order it expects
#[derive(Debug)]
pub struct TrainedModel {
    pub estimator: ForestEstimator,
    pub feature_names: Vec<String>,
}

/// Build the feature matrix and target vector for a set of rows
pub fn build_training_matrix(
    rows: &[TrainingRow],
    feature_names: &[String],
) -> Result<(Vec<Vec<f64>>, Vec<f64>), PipelineError> {
    let mut features = Vec::with_capacity(rows.len());
    let mut targets = Vec::with_capacity(rows.len());

    for row in rows {
        features.push(FeatureObservation::from(row.sensor).to_vector(feature_names)?);
        targets.push(row.optimal_duration);
    }

    Ok((features, targets))
}

/// Fit the forest on optimal durations
///
/// Blocking; run from `spawn_blocking` inside async code.
pub fn train_model(rows: &[TrainingRow], config: &TrainingConfig) -> Result<TrainedModel, PipelineError> {
    if rows.len() < config.min_training_rows {
        return Err(PipelineError::InsufficientTrainingData {
            found: rows.len(),
            required: config.min_training_rows,
        });
    }

    let feature_names = default_feature_names();
    let (features, targets) = build_training_matrix(rows, &feature_names)?;

    let estimator = ForestEstimator::fit(features, targets, &config.forest)?;
    info!(
        rows = rows.len(),
        n_trees = config.forest.n_trees,
        max_depth = config.forest.max_depth,
        "Model training completed"
    );

    Ok(TrainedModel {
        estimator,
        feature_names,
    })
}
