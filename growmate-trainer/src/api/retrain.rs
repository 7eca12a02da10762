//! Retrain trigger
//!
//! POST /retrain takes no body and runs the whole pipeline inside the request.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::PipelineError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RetrainResponse {
    pub status: String,
    pub records_used: usize,
    pub average_optimal_duration: f64,
    pub target_moisture: f64,
    pub training_date: String,
}

/// POST /retrain
pub async fn retrain(State(state): State<AppState>) -> Result<Json<RetrainResponse>, PipelineError> {
    let report = state.pipeline.run().await?;

    Ok(Json(RetrainResponse {
        status: "success".to_string(),
        records_used: report.records_used,
        average_optimal_duration: report.average_optimal_duration,
        target_moisture: report.target_moisture,
        training_date: growmate_common::time::to_iso8601(&report.training_date),
    }))
}
