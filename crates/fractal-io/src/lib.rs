//! Image output for rendered fractals.
//!
//! Writers follow a create / write / close protocol: [`create`] opens the
//! file for fixed dimensions, [`ImageWriter::write`] takes the complete
//! interleaved 8-bit buffer, [`ImageWriter::close`] finishes the file.
//! [`assemble`] quantizes a [`ColorBuffer`] and drives that protocol;
//! [`assemble_into`] does the same for a writer opened ahead of time.
//!
//! # Example
//!
//! ```rust,ignore
//! use fractal_io::assemble;
//!
//! let pixels = assemble(&color, "mandelbrot.png")?;
//! ```

pub mod detect;
pub mod error;
pub mod traits;

#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "png")]
pub mod png;

use std::path::Path;

use fractal_core::{ColorBuffer, PixelBuffer, CHANNELS};
use tracing::{debug, info, trace};

pub use detect::Format;
pub use error::{IoError, IoResult};
pub use traits::ImageWriter;

/// Opens a writer for `path`, choosing the format from its extension.
pub fn create<P: AsRef<Path>>(
    path: P,
    width: usize,
    height: usize,
    channels: usize,
) -> IoResult<Box<dyn ImageWriter>> {
    let path = path.as_ref();
    let format = Format::from_extension(path);
    trace!(path = %path.display(), ?format, width, height, channels, "fractal_io::create");

    match format {
        #[cfg(feature = "png")]
        Format::Png => Ok(Box::new(crate::png::PngWriter::create(path, width, height, channels)?)),
        #[cfg(feature = "jpeg")]
        Format::Jpeg => Ok(Box::new(crate::jpeg::JpegWriter::create(path, width, height, channels)?)),
        _ => Err(IoError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Checks that `path` names a format with a compiled-in writer.
///
/// Lets callers reject a bad output path before doing expensive work.
pub fn check_output<P: AsRef<Path>>(path: P) -> IoResult<Format> {
    let path = path.as_ref();
    let format = Format::from_extension(path);
    if format.is_writable() {
        Ok(format)
    } else {
        Err(IoError::UnsupportedFormat(path.display().to_string()))
    }
}

/// Quantizes `color` to 8 bits and writes it to `path`.
///
/// The image is `color.cols()` wide and `color.rows()` high with 3
/// channels. Returns the pixel buffer that was written.
pub fn assemble<P: AsRef<Path>>(color: &ColorBuffer, path: P) -> IoResult<PixelBuffer> {
    let writer = create(path, color.cols(), color.rows(), CHANNELS)?;
    assemble_into(color, writer)
}

/// Quantizes `color` and finishes a writer opened earlier with [`create`].
///
/// The writer must have been created for `color.cols()` x `color.rows()`
/// with 3 channels; anything else is a [`IoError::DimensionMismatch`].
pub fn assemble_into(color: &ColorBuffer, mut writer: Box<dyn ImageWriter>) -> IoResult<PixelBuffer> {
    let pixels = color.quantize();
    debug!(bytes = pixels.data.len(), "Quantized color buffer");

    let (width, height, channels) = writer.dimensions();
    if (width, height, channels) != (pixels.width, pixels.height, pixels.channels) {
        return Err(IoError::DimensionMismatch {
            expected: width * height * channels,
            actual: pixels.data.len(),
        });
    }

    let format = writer.format_name();
    writer.write(pixels.as_bytes())?;
    writer.close()?;

    info!(format, width = pixels.width, height = pixels.height, "Wrote image");
    Ok(pixels)
}
