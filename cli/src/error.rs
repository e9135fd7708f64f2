//! CLI error handling
//!
//! Every failure a command can hit is a [`CliError`]. At the binary boundary
//! it is rendered as a JSON error body on stderr together with a stable
//! exit code.

use nutriforecast_core::{CoreError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Command error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid record on line {line}: {source}")]
    InvalidRecord {
        line: u64,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Could not render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::Core(CoreError::Validation(err))
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
}

impl CliError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Io { .. } => "IO_ERROR",
            CliError::Csv(_) => "CSV_ERROR",
            CliError::InvalidRecord { .. } => "INVALID_RECORD",
            CliError::Core(CoreError::Validation(_)) => "VALIDATION_ERROR",
            CliError::Core(CoreError::InsufficientData { .. }) => "INSUFFICIENT_DATA",
            CliError::Core(CoreError::ModelConvergence { .. }) => "MODEL_CONVERGENCE",
            CliError::Output(_) => "OUTPUT_ERROR",
        }
    }

    /// Process exit code: 2 for bad input, 1 for everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Csv(_)
            | CliError::InvalidRecord { .. }
            | CliError::Core(CoreError::Validation(_))
            | CliError::Core(CoreError::InsufficientData { .. }) => 2,
            _ => 1,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let (message, field, line) = match self {
            CliError::InvalidRecord { line, source } => (source.user_message(), Some(source.field.clone()), Some(*line)),
            CliError::Core(CoreError::Validation(v)) => (v.user_message(), Some(v.field.clone()), None),
            other => (other.to_string(), None, None),
        };
        ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                field,
                line,
            },
        }
    }
}

/// Result type alias for commands
pub type CliResult<T> = Result<T, CliError>;
