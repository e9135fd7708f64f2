//! Error types for the NutriForecast core

use thiserror::Error;

pub use crate::validation::ValidationError;

/// Core error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Insufficient data: need at least {required} data points, found {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Model {model} failed to converge: {reason}")]
    ModelConvergence { model: &'static str, reason: String },
}

impl CoreError {
    /// Shorthand for a field-scoped validation failure
    pub fn validation(field: &str, message: &str) -> Self {
        CoreError::Validation(ValidationError::new(field, message))
    }

    /// Minimum number of data points the caller has to supply, if this is an
    /// insufficient-data error
    pub fn required_points(&self) -> Option<usize> {
        match self {
            CoreError::InsufficientData { required, .. } => Some(*required),
            _ => None,
        }
    }
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
