use thiserror::Error;

// ---------------------------------------------------------------------------
// Error kinds surfaced by every stage of the workflow
// ---------------------------------------------------------------------------

/// Errors raised by the inversion stages. Every stage aborts the run on the
/// first error; nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InversionError {
    /// Malformed time series: too few samples, non-positive sampling interval,
    /// out-of-range trace index.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A non-positive magnitude (or frequency) where a logarithm is required.
    #[error("invalid spectrum value at {frequency} Hz: {value}")]
    InvalidSpectrumValue { frequency: f64, value: f64 },

    /// The least-squares solver ran out of evaluations or stalled.
    #[error("power-law fit did not converge after {evaluations} evaluations (cost {cost:e})")]
    FitDidNotConverge { evaluations: usize, cost: f64 },

    /// Operand spectra or traces of incompatible length / frequency axis.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Configuration values violating an ordering or range invariant.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

pub type Result<T> = std::result::Result<T, InversionError>;

impl InversionError {
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        InversionError::InvalidInput(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        InversionError::ConfigurationError(msg.into())
    }
}
