//! HTTP API handlers for growmate-predictor

pub mod health;
pub mod model;
pub mod predict;

pub use health::health_routes;
pub use model::{get_model, reload_model};
pub use predict::predict;
