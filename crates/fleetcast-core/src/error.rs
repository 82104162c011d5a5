//! Error types for forecasting operations.

use thiserror::Error;

/// Result type alias for forecasting operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur during forecasting operations
///
/// Note that several expected-empty conditions are deliberately *not*
/// errors: the smoothing functions return well-defined defaults for empty
/// series, and training on a too-short series is a no-op. These variants
/// cover genuine contract violations and collaborator failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Insufficient data points for the operation
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Numerical computation error
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// A persisted model state could not be decoded or has the wrong shape
    #[error("Corrupt model state: {reason}")]
    CorruptState { reason: String },

    /// A storage collaborator failed
    #[error("Storage error: {0}")]
    Storage(String),
}
