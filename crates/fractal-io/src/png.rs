//! PNG output.
//!
//! 8-bit grayscale, RGB and RGBA with an sRGB chunk. The signature and
//! header are written when the writer is created, image data on
//! [`ImageWriter::write`], and the trailer on [`ImageWriter::close`].

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::{debug, trace};

use crate::{ImageWriter, IoError, IoResult};

/// PNG writer bound to one output file.
pub struct PngWriter {
    width: usize,
    height: usize,
    channels: usize,
    writer: Option<png::Writer<BufWriter<File>>>,
    written: bool,
}

impl PngWriter {
    /// Creates the file and writes the PNG header.
    pub fn create<P: AsRef<Path>>(path: P, width: usize, height: usize, channels: usize) -> IoResult<Self> {
        let path = path.as_ref();
        trace!(path = %path.display(), width, height, channels, "PngWriter::create");

        let color_type = match channels {
            1 => png::ColorType::Grayscale,
            2 => png::ColorType::GrayscaleAlpha,
            3 => png::ColorType::Rgb,
            4 => png::ColorType::Rgba,
            n => return Err(IoError::EncodeError(format!("unsupported channel count: {}", n))),
        };
        let w = u32::try_from(width).map_err(|_| IoError::EncodeError(format!("width too large: {width}")))?;
        let h = u32::try_from(height).map_err(|_| IoError::EncodeError(format!("height too large: {height}")))?;

        let file = File::create(path)?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), w, h);
        encoder.set_color(color_type);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::default());
        encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

        let writer = encoder
            .write_header()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;

        debug!(path = %path.display(), "Opened PNG for writing");
        Ok(Self {
            width,
            height,
            channels,
            writer: Some(writer),
            written: false,
        })
    }
}

impl ImageWriter for PngWriter {
    fn format_name(&self) -> &'static str {
        "PNG"
    }

    fn dimensions(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.channels)
    }

    fn write(&mut self, pixels: &[u8]) -> IoResult<()> {
        if self.written {
            return Err(IoError::InvalidState("image data already written"));
        }
        self.check_len(pixels)?;
        let writer = self.writer.as_mut().ok_or(IoError::InvalidState("writer closed"))?;
        writer
            .write_image_data(pixels)
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        self.written = true;
        Ok(())
    }

    fn close(mut self: Box<Self>) -> IoResult<()> {
        let writer = self.writer.take().ok_or(IoError::InvalidState("writer closed"))?;
        if !self.written {
            return Err(IoError::InvalidState("closed before image data was written"));
        }
        writer.finish().map_err(|e| IoError::EncodeError(e.to_string()))
    }
}
