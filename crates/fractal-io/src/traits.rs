//! Writer interface shared by all output formats.

use crate::{IoError, IoResult};

/// Streaming image writer.
///
/// A writer is created for fixed dimensions (see [`crate::create`]), receives
/// the complete interleaved 8-bit buffer once through [`write`](Self::write),
/// and finishes the file in [`close`](Self::close).
pub trait ImageWriter {
    /// Format name, e.g. "PNG".
    fn format_name(&self) -> &'static str;

    /// `(width, height, channels)` the writer was created with.
    fn dimensions(&self) -> (usize, usize, usize);

    /// Writes the full image buffer.
    fn write(&mut self, pixels: &[u8]) -> IoResult<()>;

    /// Finishes and flushes the file.
    fn close(self: Box<Self>) -> IoResult<()>;

    /// Byte count `write` expects.
    fn expected_len(&self) -> usize {
        let (w, h, c) = self.dimensions();
        w * h * c
    }

    /// Checks a buffer against [`expected_len`](Self::expected_len).
    fn check_len(&self, pixels: &[u8]) -> IoResult<()> {
        let expected = self.expected_len();
        if pixels.len() != expected {
            return Err(IoError::DimensionMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(())
    }
}
