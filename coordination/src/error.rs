//! Ensemble error types
//!
//! Every core component fails fast with one of these variants and never
//! returns a partial result.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ensemble operations
pub type EnsembleResult<T> = Result<T, EnsembleError>;

/// Errors that can occur during aggregation, resolution and evaluation
#[derive(Error, Debug)]
pub enum EnsembleError {
    /// Empty or malformed prediction sets, bad parameters
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Parallel sequences of unequal length
    #[error("Shape mismatch in {context}: expected {expected} items, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Confidence total of zero
    #[error("Division by zero: {message}")]
    DivisionByZero { message: String },

    /// Operation unsupported by a given model
    #[error("Not implemented: {message}")]
    NotImplemented { message: String },

    /// Persisted artifact missing
    #[error("Resource not found at {}", .path.display())]
    ResourceNotFound { path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnsembleError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create a division by zero error
    pub fn division_by_zero(message: impl Into<String>) -> Self {
        Self::DivisionByZero {
            message: message.into(),
        }
    }

    /// Create a not implemented error
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }

    /// Create a resource not found error
    pub fn resource_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ResourceNotFound { path: path.into() }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::DivisionByZero { .. } => "DIVISION_BY_ZERO",
            Self::NotImplemented { .. } => "NOT_IMPLEMENTED",
            Self::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Whether this error means the model does not support the operation
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}
