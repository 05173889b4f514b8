//! Error types for spraywatch
//!
//! Only malformed configuration and contract violations surface as errors.
//! Drift detection reports state conditions through `DriftState` instead.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Spraywatch error types
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or setup value outside its declared range
    #[error("Invalid configuration: {0}\nCheck the value against its documented range")]
    InvalidConfig(String),

    /// Degenerate input with no closed-form fallback
    #[error("Computation error: {0}")]
    Computation(String),

    /// Run identifier already present in the collection
    #[error("Duplicate run id: {0}\nRun identifiers must be unique within a collection")]
    DuplicateRun(String),

    /// Run identifier not present in the collection
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Arrow conversion error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Build an `InvalidConfig` error for a value outside `[min, max]`.
    pub(crate) fn out_of_range(field: &str, value: f64, min: f64, max: f64) -> Self {
        Self::InvalidConfig(format!(
            "{field} = {value} is outside the allowed range [{min}, {max}]"
        ))
    }
}
