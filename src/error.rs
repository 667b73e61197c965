//! Error types for adversarial training

use thiserror::Error;

/// Errors surfaced before or during a training or generation run.
///
/// Precondition violations on the batch source fail fast, before any
/// training step executes. Numeric instability (NaN/Inf losses) and
/// malformed tensor shapes inside the autograd ops deliberately panic
/// instead: there is no resilience layer, a run is either correct or fatal.
#[derive(Debug, Error)]
pub enum GanError {
    #[error("batch source yielded no batches")]
    EmptyBatchSource,

    #[error("batch {index} has {got} channels, expected {expected} (shape {shape:?})")]
    ChannelMismatch {
        index: usize,
        got: usize,
        expected: usize,
        shape: [usize; 4],
    },

    #[error("batch {index} has an empty dimension (shape {shape:?})")]
    EmptyBatch { index: usize, shape: [usize; 4] },

    #[error("invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),
}

/// Result type for GAN operations
pub type Result<T> = std::result::Result<T, GanError>;
