//! growmate-predictor library
//!
//! Serves watering-duration predictions from the most recently published
//! model artifact.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod error;

pub use cache::ModelCache;
pub use error::PredictError;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ModelCache>,
}

impl AppState {
    pub fn new(cache: ModelCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/predict", post(api::predict))
        .route("/model", get(api::get_model))
        .route("/model/reload", post(api::reload_model))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
