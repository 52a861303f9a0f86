//! Error types for fractal-core operations.
//!
//! Covers reading and validating the parameter file and constructing
//! color/pixel buffers.
//!
//! # Usage
//!
//! ```rust
//! use fractal_core::{Error, Result};
//!
//! fn check_rows(rows: usize) -> Result<()> {
//!     if rows == 0 {
//!         return Err(Error::InvalidDimensions { rows, cols: 1 });
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading parameters or building buffers.
#[derive(Debug, Error)]
pub enum Error {
    /// Parameter file could not be opened or read.
    #[error("cannot open file: {}: {source}", path.display())]
    InputFile {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A field was missing from the parameter text.
    #[error("missing parameter field '{0}'")]
    MissingField(&'static str),

    /// A field could not be parsed as a number.
    #[error("invalid value '{value}' for parameter field '{field}'")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Offending token.
        value: String,
    },

    /// Grid dimensions must both be positive and the color buffer
    /// addressable with a 32-bit index.
    #[error("invalid grid dimensions: {rows} rows x {cols} cols")]
    InvalidDimensions {
        /// Requested rows.
        rows: usize,
        /// Requested cols.
        cols: usize,
    },

    /// Iteration cap must not be negative.
    #[error("invalid maximum iteration count: {0}")]
    InvalidIterations(i64),

    /// Buffer length does not match its declared dimensions.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },
}
