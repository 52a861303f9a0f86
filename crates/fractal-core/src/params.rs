//! Fractal parameters and render mode.
//!
//! The parameter file is plain whitespace-separated text with a fixed
//! field order and no labels:
//!
//! ```text
//! rows cols
//! maxIterations
//! maxLengthSquared
//! realMin realMax
//! imagMin imagMax
//! juliaRe juliaIm
//! c00 c01 c02
//! c10 c11 c12
//! c20 c21 c22
//! ```
//!
//! Line breaks carry no meaning; only token order does.
//!
//! # Example
//!
//! ```rust
//! use fractal_core::FractalParameters;
//!
//! let text = "4 6\n50\n4.0\n-2 1\n-1 1\n0 0\n0 0 0\n0.5 0.5 0.5\n1 1 1\n";
//! let params: FractalParameters = text.parse().unwrap();
//! assert_eq!(params.rows, 4);
//! assert_eq!(params.cols, 6);
//! ```

use std::path::Path;
use std::str::{FromStr, SplitWhitespace};

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// Number of base color coefficients (3x3, row-major).
pub const BASE_COLOR_LEN: usize = 9;

/// Channels per pixel in every buffer (RGB).
pub const CHANNELS: usize = 3;

/// Which escape-time set to render.
///
/// The discriminant is the flag value the kernel receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum FractalMode {
    /// z starts at 0, c is the pixel position.
    #[default]
    Mandelbrot = 0,
    /// z starts at the pixel position, c is the Julia constant.
    Julia = 1,
}

impl FractalMode {
    /// Parses the mode from a command-line word.
    ///
    /// Only the first character is inspected: `'M'` selects Mandelbrot and
    /// anything else (including an empty word) selects Julia. A first
    /// character other than `'M'` or `'J'` is accepted but logged.
    pub fn from_arg(arg: &str) -> Self {
        match arg.chars().next() {
            Some('M') => Self::Mandelbrot,
            Some('J') => Self::Julia,
            other => {
                warn!(arg, first = ?other, "Unrecognized mode, rendering Julia set");
                Self::Julia
            }
        }
    }

    /// Flag value passed to the kernel.
    pub fn flag(self) -> i32 {
        self as i32
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Mandelbrot => "Mandelbrot",
            Self::Julia => "Julia",
        }
    }
}

/// Everything read from the parameter file.
#[derive(Debug, Clone, PartialEq)]
pub struct FractalParameters {
    /// Image height in pixels.
    pub rows: usize,
    /// Image width in pixels.
    pub cols: usize,
    /// Iteration cap per pixel.
    pub max_iterations: u32,
    /// Squared escape radius.
    pub max_length_squared: f64,
    /// Real-axis bounds `(min, max)`.
    pub real: (f64, f64),
    /// Imaginary-axis bounds `(min, max)`.
    pub imag: (f64, f64),
    /// Julia constant `(re, im)`, ignored in Mandelbrot mode.
    pub julia: (f64, f64),
    /// Base color coefficients, row-major `c00..c22`.
    pub base_color: [f64; BASE_COLOR_LEN],
}

impl FractalParameters {
    /// Reads and parses a parameter file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        trace!(path = %path.display(), "FractalParameters::load");

        let text = std::fs::read_to_string(path).map_err(|source| Error::InputFile {
            path: path.to_path_buf(),
            source,
        })?;
        let params: Self = text.parse()?;
        debug!(
            path = %path.display(),
            rows = params.rows,
            cols = params.cols,
            max_iterations = params.max_iterations,
            "Loaded parameters"
        );
        Ok(params)
    }

    /// Number of pixels in the requested image.
    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of doubles in the color buffer.
    pub fn color_len(&self) -> usize {
        self.pixel_count() * CHANNELS
    }
}

impl FromStr for FractalParameters {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut fields = Fields(s.split_whitespace());

        let rows = fields.dimension("rows")?;
        let cols = fields.dimension("cols")?;
        // The kernel indexes the color buffer with a 32-bit int.
        let channels = rows.checked_mul(cols).and_then(|n| n.checked_mul(CHANNELS));
        if rows == 0 || cols == 0 || channels.is_none_or(|n| n > i32::MAX as usize) {
            return Err(Error::InvalidDimensions { rows, cols });
        }

        let max_iterations = fields.int("maxIterations")?;
        if !(0..=i32::MAX as i64).contains(&max_iterations) {
            return Err(Error::InvalidIterations(max_iterations));
        }

        let max_length_squared = fields.float("maxLengthSquared")?;
        let real = (fields.float("realMin")?, fields.float("realMax")?);
        let imag = (fields.float("imagMin")?, fields.float("imagMax")?);
        let julia = (fields.float("juliaRe")?, fields.float("juliaIm")?);

        const COLOR_FIELDS: [&str; BASE_COLOR_LEN] =
            ["c00", "c01", "c02", "c10", "c11", "c12", "c20", "c21", "c22"];
        let mut base_color = [0.0; BASE_COLOR_LEN];
        for (slot, name) in base_color.iter_mut().zip(COLOR_FIELDS) {
            *slot = fields.float(name)?;
        }

        if real.0 >= real.1 || imag.0 >= imag.1 {
            warn!(?real, ?imag, "Axis bounds are degenerate or inverted");
        }
        let trailing = fields.0.count();
        if trailing > 0 {
            debug!(trailing, "Ignoring trailing tokens in parameter file");
        }

        Ok(Self {
            rows,
            cols,
            max_iterations: max_iterations as u32,
            max_length_squared,
            real,
            imag,
            julia,
            base_color,
        })
    }
}

/// Token cursor that names the field being read in its errors.
struct Fields<'a>(SplitWhitespace<'a>);

impl Fields<'_> {
    fn next(&mut self, field: &'static str) -> Result<&str> {
        self.0.next().ok_or(Error::MissingField(field))
    }

    fn int(&mut self, field: &'static str) -> Result<i64> {
        let token = self.next(field)?;
        token.parse().map_err(|_| Error::InvalidField {
            field,
            value: token.to_string(),
        })
    }

    fn dimension(&mut self, field: &'static str) -> Result<usize> {
        let value = self.int(field)?;
        // Dimensions travel to the kernel as 32-bit ints.
        if !(0..=i32::MAX as i64).contains(&value) {
            return Err(Error::InvalidField {
                field,
                value: value.to_string(),
            });
        }
        Ok(value as usize)
    }

    fn float(&mut self, field: &'static str) -> Result<f64> {
        let token = self.next(field)?;
        token.parse().map_err(|_| Error::InvalidField {
            field,
            value: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
        480 640
        256
        4.0
        -2.0 1.0
        -1.2 1.2
        -0.8 0.156
        0.0 0.0 0.2
        1.0 0.5 0.0
        0.0 0.0 0.0
    ";

    #[test]
    fn test_parse_sample() {
        let p: FractalParameters = SAMPLE.parse().unwrap();
        assert_eq!(p.rows, 480);
        assert_eq!(p.cols, 640);
        assert_eq!(p.max_iterations, 256);
        assert_relative_eq!(p.max_length_squared, 4.0);
        assert_eq!(p.real, (-2.0, 1.0));
        assert_eq!(p.imag, (-1.2, 1.2));
        assert_eq!(p.julia, (-0.8, 0.156));
        assert_eq!(p.base_color, [0.0, 0.0, 0.2, 1.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(p.color_len(), 480 * 640 * 3);
    }

    #[test]
    fn test_layout_is_token_based() {
        let flat = SAMPLE.split_whitespace().collect::<Vec<_>>().join(" ");
        let a: FractalParameters = SAMPLE.parse().unwrap();
        let b: FractalParameters = flat.parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = "10 10\n5\n4.0\n-2 1\n-1 1\n0 0\n1 1 1\n".parse::<FractalParameters>().unwrap_err();
        assert!(matches!(err, Error::MissingField("c10")), "{err}");
    }

    #[test]
    fn test_bad_number_is_named() {
        let err = "10 ten\n".parse::<FractalParameters>().unwrap_err();
        match err {
            Error::InvalidField { field, value } => {
                assert_eq!(field, "cols");
                assert_eq!(value, "ten");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_rows_rejected() {
        let text = SAMPLE.replacen("480", "0", 1);
        let err = text.parse::<FractalParameters>().unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { rows: 0, cols: 640 }));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        // 1 x 715827882 x 3 is the largest buffer a 32-bit index reaches.
        let fits = SAMPLE.replacen("480 640", "1 715827882", 1);
        assert_eq!(fits.parse::<FractalParameters>().unwrap().color_len(), 2_147_483_646);

        let text = SAMPLE.replacen("480 640", "26755 26755", 1);
        let err = text.parse::<FractalParameters>().unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions { rows: 26755, cols: 26755 }));
    }

    #[test]
    fn test_negative_iterations_rejected() {
        let text = SAMPLE.replacen("256", "-1", 1);
        let err = text.parse::<FractalParameters>().unwrap_err();
        assert!(matches!(err, Error::InvalidIterations(-1)));
    }

    #[test]
    fn test_degenerate_bounds_accepted() {
        let text = "2 2\n0\n4.0\n0.5 0.5\n0 0\n0 0\n1 0 0\n0 1 0\n0 0 1\n";
        let p: FractalParameters = text.parse().unwrap();
        assert_eq!(p.max_iterations, 0);
        assert_eq!(p.real, (0.5, 0.5));
    }

    #[test]
    fn test_mode_from_arg() {
        assert_eq!(FractalMode::from_arg("M"), FractalMode::Mandelbrot);
        assert_eq!(FractalMode::from_arg("Mandelbrot"), FractalMode::Mandelbrot);
        assert_eq!(FractalMode::from_arg("J"), FractalMode::Julia);
        // Anything that does not start with 'M' renders Julia.
        assert_eq!(FractalMode::from_arg("m"), FractalMode::Julia);
        assert_eq!(FractalMode::from_arg("x"), FractalMode::Julia);
        assert_eq!(FractalMode::from_arg(""), FractalMode::Julia);
        assert_eq!(FractalMode::Mandelbrot.flag(), 0);
        assert_eq!(FractalMode::Julia.flag(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = FractalParameters::load("/definitely/not/here/params.txt").unwrap_err();
        assert!(matches!(err, Error::InputFile { .. }));
    }
}
