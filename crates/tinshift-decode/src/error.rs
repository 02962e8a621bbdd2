//! Decoding errors.

use thiserror::Error;

/// Error raised when a stored geometry cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The blob does not have the fixed size of a two-dimensional point.
    #[error("point geometry must be {expected} bytes long, got {actual}")]
    InvalidPointLength { expected: usize, actual: usize },
}

/// Result alias for decoding functions.
pub type DecodeResult<T> = Result<T, DecodeError>;
