//! growmate-trainer library
//!
//! Rebuilds the watering-duration model from logged sensor readings and
//! watering outcomes, then publishes it for the predictor.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod pipeline;
pub mod sources;

pub use error::PipelineError;
pub use pipeline::{RetrainPipeline, RetrainReport};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RetrainPipeline>,
}

impl AppState {
    pub fn new(pipeline: RetrainPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::post;

    Router::new()
        .route("/retrain", post(api::retrain))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
