//! # fractal-core
//!
//! Core types for escape-time fractal rendering.
//!
//! - [`FractalParameters`] - Values read from the parameter file
//! - [`FractalMode`] - Mandelbrot or Julia
//! - [`ColorBuffer`] - Normalized RGB doubles produced by the kernel
//! - [`PixelBuffer`] - Quantized 8-bit samples for the image writer
//!
//! ## Crate Structure
//!
//! ```text
//! fractal-core (this crate)
//!    ^
//!    |
//!    +-- fractal-io (image writers)
//!    +-- fractal-compute (device selection, dispatch, execution)
//!    +-- fractal-cli
//! ```

#![warn(missing_docs)]

pub mod buffer;
pub mod error;
pub mod params;

pub use buffer::{quantize, ColorBuffer, PixelBuffer};
pub use error::{Error, Result};
pub use params::{FractalMode, FractalParameters, BASE_COLOR_LEN, CHANNELS};
