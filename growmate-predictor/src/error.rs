//! Prediction service errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PredictError {
    /// Malformed prediction payload (400)
    #[error("{0}")]
    InvalidInput(String),

    /// No artifact has been loaded (500)
    #[error("Model not available: {0}")]
    ModelUnavailable(String),

    /// Storage, deserialization or model failure (500)
    #[error(transparent)]
    Common(#[from] growmate_common::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PredictError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PredictError::ModelUnavailable(_) | PredictError::Common(_) | PredictError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Prediction failed: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
