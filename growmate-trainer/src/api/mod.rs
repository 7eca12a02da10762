//! HTTP API handlers for growmate-trainer

pub mod health;
pub mod retrain;

pub use health::health_routes;
pub use retrain::retrain;
