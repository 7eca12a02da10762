//! Retrain pipeline errors

use crate::sources::SourceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Nothing to reconcile (400)
    #[error("No training data available")]
    DataUnavailable,

    /// Every record was filtered out (400)
    #[error("No valid records after filtering")]
    NoValidRecords,

    /// Too few rows to fit a model (400)
    #[error("Insufficient training data: {found} rows, at least {required} required")]
    InsufficientTrainingData { found: usize, required: usize },

    /// Database or REST log source failure
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Storage, serialization or model failure
    #[error(transparent)]
    Common(#[from] growmate_common::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::DataUnavailable
            | PipelineError::NoValidRecords
            | PipelineError::InsufficientTrainingData { .. } => StatusCode::BAD_REQUEST,
            PipelineError::Source(_) | PipelineError::Common(_) | PipelineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Retrain failed: {}", message);
        }

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_errors_are_client_errors() {
        assert_eq!(PipelineError::DataUnavailable.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(PipelineError::NoValidRecords.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            PipelineError::InsufficientTrainingData { found: 2, required: 5 }.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_infrastructure_errors_are_server_errors() {
        let err = PipelineError::from(SourceError::Http("connection refused".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = PipelineError::from(growmate_common::Error::Model("fit failed".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_messages() {
        assert_eq!(PipelineError::DataUnavailable.to_string(), "No training data available");
        assert_eq!(PipelineError::NoValidRecords.to_string(), "No valid records after filtering");
    }
}
