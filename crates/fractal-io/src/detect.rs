//! Format detection from the output file extension.

use std::path::Path;

/// Output formats known to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
    /// Unknown/unsupported format.
    Unknown,
}

impl Format {
    /// Detects format from file extension only (case-insensitive).
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("png") => Format::Png,
            Some("jpg") | Some("jpeg") => Format::Jpeg,
            _ => Format::Unknown,
        }
    }

    /// Whether a writer for this format was compiled in.
    pub fn is_writable(&self) -> bool {
        match self {
            Format::Png => cfg!(feature = "png"),
            Format::Jpeg => cfg!(feature = "jpeg"),
            Format::Unknown => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Format::from_extension("out.png"), Format::Png);
        assert_eq!(Format::from_extension("OUT.PNG"), Format::Png);
        assert_eq!(Format::from_extension("a/b/c.jpg"), Format::Jpeg);
        assert_eq!(Format::from_extension("c.jpeg"), Format::Jpeg);
        assert_eq!(Format::from_extension("c.tga"), Format::Unknown);
        assert_eq!(Format::from_extension("noext"), Format::Unknown);
        assert!(!Format::Unknown.is_writable());
    }
}
