//! Color and pixel buffers.
//!
//! [`ColorBuffer`] holds the normalized doubles read back from the device;
//! [`PixelBuffer`] holds the quantized 8-bit samples handed to an image
//! writer. Both are dense, row-major and channel-innermost.

use tracing::trace;

use crate::error::{Error, Result};
use crate::params::CHANNELS;

/// Quantizes one normalized channel value to a byte.
///
/// Computes `floor(v * 255 + 0.5)` after clamping `v` to `[0, 1]`, so
/// out-of-range kernel output saturates instead of wrapping. NaN maps to 0.
///
/// ```rust
/// use fractal_core::quantize;
///
/// assert_eq!(quantize(0.0), 0);
/// assert_eq!(quantize(0.5), 128);
/// assert_eq!(quantize(1.0), 255);
/// ```
#[inline]
pub fn quantize(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5).floor() as u8
}

/// Per-pixel normalized RGB values, `rows * cols * 3` doubles.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl ColorBuffer {
    /// Wraps device output; `data` must hold exactly `rows * cols * 3` values.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        let expected = rows * cols * CHANNELS;
        if data.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Zero-filled buffer for the given dimensions.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols * CHANNELS],
        }
    }

    /// Image height.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Image width.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Raw channel values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable channel values, used as the readback target.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// RGB triple at `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize) -> [f64; 3] {
        let i = (row * self.cols + col) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Quantizes every channel of the requested grid into a [`PixelBuffer`].
    ///
    /// Visits rows, then columns, then channels; reads exactly
    /// `rows * cols * 3` values and produces the same number of bytes.
    pub fn quantize(&self) -> PixelBuffer {
        trace!(rows = self.rows, cols = self.cols, "ColorBuffer::quantize");
        let mut bytes = Vec::with_capacity(self.rows * self.cols * CHANNELS);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let base = (row * self.cols + col) * CHANNELS;
                for channel in 0..CHANNELS {
                    bytes.push(quantize(self.data[base + channel]));
                }
            }
        }
        PixelBuffer {
            width: self.cols,
            height: self.rows,
            channels: CHANNELS,
            data: bytes,
        }
    }
}

/// Quantized 8-bit image, `height * width * channels` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Samples per pixel.
    pub channels: usize,
    /// Samples, row-major and channel-innermost.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Samples as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
