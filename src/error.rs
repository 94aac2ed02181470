//! Error types for the aquacast pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while resolving, fusing, training or forecasting.
///
/// Every variant is terminal for a single pipeline run; no partial results
/// are returned alongside an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A raw entity label could not be matched to a canonical label.
    #[error("unresolved entity label '{label}' (best score {best_score:.3})")]
    UnresolvedEntity { label: String, best_score: f64 },

    /// Training loss became NaN or infinite.
    #[error("training diverged at epoch {epoch}: loss {loss}")]
    TrainingDiverged { epoch: usize, loss: f64 },

    /// Training was cancelled between epochs.
    #[error("training cancelled after epoch {epoch}")]
    Cancelled { epoch: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}
