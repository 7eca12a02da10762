//! Prediction endpoint
//!
//! POST /predict with `{temperature, humidity, light, moisture_before}`.
//! Values may be numbers or numeric strings.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use growmate_common::FeatureObservation;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::PredictError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    /// Recommended watering time in seconds
    pub watering_duration: f64,
}

/// Parse the request body into an observation
pub fn parse_observation(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<FeatureObservation, PredictError> {
    let Json(value) = payload.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            PredictError::InvalidInput("No JSON payload".to_string())
        }
        other => PredictError::InvalidInput(format!("Invalid JSON payload: {}", other.body_text())),
    })?;

    let empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Err(PredictError::InvalidInput("No JSON payload".to_string()));
    }

    FeatureObservation::from_payload(&value)
        .map_err(|e| PredictError::InvalidInput(format!("Invalid input: {}", e)))
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, PredictError> {
    let observation = parse_observation(payload)?;
    let artifact = state.cache.current().await?;

    let watering_duration = artifact.predict(&observation)?;
    debug!(?observation, watering_duration, "Predicted watering duration");

    Ok(Json(PredictResponse { watering_duration }))
}
