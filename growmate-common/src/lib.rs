//! # GrowMate Common Library
//!
//! Shared code for the GrowMate trainer and predictor services:
//! - Configuration loading
//! - Log record data model and numeric coercion
//! - Feature vector contract shared by training and prediction
//! - Random forest estimator wrapper and the published model artifact
//! - Blob storage for artifacts

pub mod artifact;
pub mod config;
pub mod error;
pub mod estimator;
pub mod features;
pub mod records;
pub mod storage;
pub mod time;

pub use artifact::ModelArtifact;
pub use error::{Error, Result};
pub use features::{FeatureObservation, FEATURE_NAMES};
