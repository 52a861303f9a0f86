//! Error types for image output.

use std::io;
use thiserror::Error;

/// Image writer error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No writer handles this output format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Buffer does not match the dimensions the writer was created with.
    #[error("dimension mismatch: expected {expected} bytes, got {actual}")]
    DimensionMismatch {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// Writer used out of order (write after write, close before write).
    #[error("invalid writer state: {0}")]
    InvalidState(&'static str),
}

/// Result type for image output.
pub type IoResult<T> = Result<T, IoError>;
