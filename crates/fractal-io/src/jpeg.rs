//! JPEG output via `jpeg-encoder`.
//!
//! The file is created up front so an unwritable path fails before any
//! rendering work; the image is encoded to memory on
//! [`ImageWriter::write`] and flushed to disk on [`ImageWriter::close`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::trace;

use crate::{ImageWriter, IoError, IoResult};

/// Default encoder quality (1-100).
pub const DEFAULT_QUALITY: u8 = 90;

/// JPEG writer bound to one output file.
pub struct JpegWriter {
    width: u16,
    height: u16,
    channels: usize,
    quality: u8,
    file: Option<BufWriter<File>>,
    encoded: Option<Vec<u8>>,
}

impl JpegWriter {
    /// Creates the output file with default quality.
    pub fn create<P: AsRef<Path>>(path: P, width: usize, height: usize, channels: usize) -> IoResult<Self> {
        Self::create_with_quality(path, width, height, channels, DEFAULT_QUALITY)
    }

    /// Creates the output file with an explicit quality (1-100).
    pub fn create_with_quality<P: AsRef<Path>>(
        path: P,
        width: usize,
        height: usize,
        channels: usize,
        quality: u8,
    ) -> IoResult<Self> {
        let path = path.as_ref();
        trace!(path = %path.display(), width, height, channels, quality, "JpegWriter::create");

        if !matches!(channels, 1 | 3 | 4) {
            return Err(IoError::EncodeError(format!("unsupported channel count: {}", channels)));
        }
        // JPEG stores dimensions as 16-bit values.
        let w = u16::try_from(width).map_err(|_| IoError::EncodeError(format!("width too large: {width}")))?;
        let h = u16::try_from(height).map_err(|_| IoError::EncodeError(format!("height too large: {height}")))?;

        let file = BufWriter::new(File::create(path)?);
        Ok(Self {
            width: w,
            height: h,
            channels,
            quality: quality.clamp(1, 100),
            file: Some(file),
            encoded: None,
        })
    }
}

impl ImageWriter for JpegWriter {
    fn format_name(&self) -> &'static str {
        "JPEG"
    }

    fn dimensions(&self) -> (usize, usize, usize) {
        (self.width as usize, self.height as usize, self.channels)
    }

    fn write(&mut self, pixels: &[u8]) -> IoResult<()> {
        use jpeg_encoder::{ColorType, Encoder};

        if self.encoded.is_some() {
            return Err(IoError::InvalidState("image data already written"));
        }
        self.check_len(pixels)?;

        let color_type = match self.channels {
            1 => ColorType::Luma,
            4 => ColorType::Rgba,
            _ => ColorType::Rgb,
        };
        let mut buffer = Vec::new();
        let encoder = Encoder::new(&mut buffer, self.quality);
        encoder
            .encode(pixels, self.width, self.height, color_type)
            .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;
        self.encoded = Some(buffer);
        Ok(())
    }

    fn close(mut self: Box<Self>) -> IoResult<()> {
        let mut file = self.file.take().ok_or(IoError::InvalidState("writer closed"))?;
        let data = self
            .encoded
            .take()
            .ok_or(IoError::InvalidState("closed before image data was written"))?;
        file.write_all(&data)?;
        file.flush()?;
        Ok(())
    }
}
