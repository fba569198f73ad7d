use thiserror::Error;

/// Errors returned by modeling operations.
#[derive(Debug, Error)]
pub enum GmmError {
    #[error("empty input: no feature frames")]
    EmptyInput,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("too few frames: need at least {needed}, got {got}")]
    TooFewFrames { needed: usize, got: usize },

    #[error("scaler not fitted")]
    NotFitted,
}
