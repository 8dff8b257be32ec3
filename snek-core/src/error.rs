//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Debug, Error)]
pub enum SnekError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// Unrecognized reward shaping mode string.
    #[error("Unrecognized reward shaping mode: {0}")]
    UnknownRewardShaping(String),

    /// A training set cannot be built from a batch without transitions.
    #[error("Cannot build a training set from an empty batch")]
    EmptyBatch,
}
