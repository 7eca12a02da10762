//! Common error types for GrowMate

use thiserror::Error;

/// Common result type for GrowMate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across GrowMate services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Regression model fitting or prediction failure
    #[error("Model error: {0}")]
    Model(String),
}
