//! Shared enumeration describing the stream formats the transformer can produce.

use core::fmt;
use core::str::FromStr;
use std::path::Path;

/// Compressed stream formats recognised by the workspace.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CompressionAlgorithm {
    /// DEFLATE with a gzip header and CRC-32 trailer (`.gz`).
    Gzip,
    /// DEFLATE with a zlib header and Adler-32 trailer (`.zz`).
    Zlib,
    /// Zstandard frames (`.zst`).
    #[cfg(feature = "zstd")]
    Zstd,
    /// Brotli streams (`.br`).
    #[cfg(feature = "brotli")]
    Brotli,
}

impl CompressionAlgorithm {
    /// Returns the canonical display name used for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
            #[cfg(feature = "zstd")]
            Self::Zstd => "zstd",
            #[cfg(feature = "brotli")]
            Self::Brotli => "brotli",
        }
    }

    /// Returns the file suffix, including the leading dot, for compressed output.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Gzip => ".gz",
            Self::Zlib => ".zz",
            #[cfg(feature = "zstd")]
            Self::Zstd => ".zst",
            #[cfg(feature = "brotli")]
            Self::Brotli => ".br",
        }
    }

    /// Returns `true` for the DEFLATE family handled by flate2.
    #[must_use]
    pub const fn is_deflate(self) -> bool {
        matches!(self, Self::Gzip | Self::Zlib)
    }

    /// Returns the default algorithm; gzip output is extractable on any host.
    #[must_use]
    pub const fn default_algorithm() -> Self {
        Self::Gzip
    }

    /// Returns the set of algorithms available in the current build.
    #[must_use]
    pub fn available() -> &'static [Self] {
        const ALGORITHMS: &[CompressionAlgorithm] = &[
            CompressionAlgorithm::Gzip,
            CompressionAlgorithm::Zlib,
            #[cfg(feature = "zstd")]
            CompressionAlgorithm::Zstd,
            #[cfg(feature = "brotli")]
            CompressionAlgorithm::Brotli,
        ];
        ALGORITHMS
    }

    /// Detects the algorithm from a compressed file's suffix.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::available()
            .iter()
            .copied()
            .find(|algorithm| has_suffix(name, algorithm.suffix()))
    }

    /// Removes this algorithm's suffix from `path`, if present.
    ///
    /// Returns `None` when the file name does not carry the suffix or would
    /// become empty.
    #[must_use]
    pub fn strip_suffix(self, path: &Path) -> Option<std::path::PathBuf> {
        let name = path.file_name()?.to_str()?;
        if !has_suffix(name, self.suffix()) || name.len() == self.suffix().len() {
            return None;
        }
        let stem = &name[..name.len() - self.suffix().len()];
        Some(path.with_file_name(stem))
    }
}

fn has_suffix(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.is_char_boundary(name.len() - suffix.len())
        && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        Self::default_algorithm()
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when attempting to parse an unsupported compression algorithm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompressionAlgorithmParseError {
    input: String,
}

impl CompressionAlgorithmParseError {
    /// Creates a parse error capturing the original input.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for CompressionAlgorithmParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported compression algorithm: {}", self.input)
    }
}

impl std::error::Error for CompressionAlgorithmParseError {}

impl FromStr for CompressionAlgorithm {
    type Err = CompressionAlgorithmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "zlib" | "zz" => Ok(Self::Zlib),
            #[cfg(feature = "zstd")]
            "zstd" | "zst" => Ok(Self::Zstd),
            #[cfg(feature = "brotli")]
            "brotli" | "br" => Ok(Self::Brotli),
            other => Err(CompressionAlgorithmParseError::new(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn available_algorithms_always_include_deflate_family() {
        let available = CompressionAlgorithm::available();
        assert!(available.contains(&CompressionAlgorithm::Gzip));
        assert!(available.contains(&CompressionAlgorithm::Zlib));
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn available_algorithms_include_zstd_when_feature_enabled() {
        let available = CompressionAlgorithm::available();
        assert!(available.contains(&CompressionAlgorithm::Zstd));
    }

    #[test]
    fn parsing_accepts_names_and_suffix_aliases() {
        assert_eq!(
            "gzip".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Gzip
        );
        assert_eq!(
            " GZ ".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Gzip
        );
        assert_eq!(
            "zlib".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Zlib
        );
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn parsing_accepts_zstd() {
        assert_eq!(
            "zst".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Zstd
        );
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn parsing_and_suffix_cover_brotli() {
        assert_eq!(
            "BR".parse::<CompressionAlgorithm>().unwrap(),
            CompressionAlgorithm::Brotli
        );
        assert_eq!(
            CompressionAlgorithm::from_path(Path::new("/spiffs/index.html.br")),
            Some(CompressionAlgorithm::Brotli)
        );
    }

    #[test]
    fn parsing_rejects_unknown_algorithms() {
        let err = "lzma"
            .parse::<CompressionAlgorithm>()
            .expect_err("lzma unsupported");
        assert_eq!(err.input(), "lzma");
    }

    #[test]
    fn from_path_detects_suffix_case_insensitively() {
        assert_eq!(
            CompressionAlgorithm::from_path(Path::new("/spiffs/demo.txt.GZ")),
            Some(CompressionAlgorithm::Gzip)
        );
        assert_eq!(
            CompressionAlgorithm::from_path(Path::new("demo.txt")),
            None
        );
    }

    #[test]
    fn strip_suffix_yields_sibling_path() {
        let stripped = CompressionAlgorithm::Gzip.strip_suffix(Path::new("/spiffs/demo.txt.gz"));
        assert_eq!(stripped, Some(PathBuf::from("/spiffs/demo.txt")));
        assert_eq!(CompressionAlgorithm::Gzip.strip_suffix(Path::new(".gz")), None);
        assert_eq!(
            CompressionAlgorithm::Zlib.strip_suffix(Path::new("demo.txt.gz")),
            None
        );
    }
}
