//! Model metadata and reload endpoints

use axum::{extract::State, Json};
use growmate_common::artifact::ArtifactSummary;
use tracing::info;

use crate::error::PredictError;
use crate::AppState;

/// GET /model
///
/// Metadata of the artifact currently served.
pub async fn get_model(State(state): State<AppState>) -> Result<Json<ArtifactSummary>, PredictError> {
    let artifact = state.cache.current().await?;
    Ok(Json(artifact.summary()))
}

/// POST /model/reload
///
/// Called by the trainer after it publishes a new artifact.
pub async fn reload_model(State(state): State<AppState>) -> Result<Json<ArtifactSummary>, PredictError> {
    let artifact = state.cache.force_reload().await?;
    info!("Model reloaded on request ({} records)", artifact.records_used);
    Ok(Json(artifact.summary()))
}
