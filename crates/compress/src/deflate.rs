//! # Overview
//!
//! DEFLATE-family sessions (gzip and zlib framing) built on
//! [`flate2`](https://docs.rs/flate2)'s low-level [`Compress`] and
//! [`Decompress`] state machines. Unlike flate2's `Read`/`Write` adapters these
//! never allocate output buffers: each [`StreamCodec::step`] writes into the
//! slice supplied by the transformer, which keeps memory bounded by the chunk
//! size.
//!
//! # Parameters
//!
//! Encoders honour the compression level and window size. zlib's `memLevel`
//! and strategy are validated, but flate2 does not expose them, so only the
//! zlib defaults (memLevel 8, default strategy) are accepted.
//!
//! Decoders always open the maximum 15-bit window. zlib streams carry their
//! window size in the header and gzip streams never need more than 32 KiB, so
//! any stream produced with a smaller window decodes without a
//! window-mismatch data error.
//!
//! # Examples
//!
//! ```
//! use compress::{CompressionLevel, DeflateParams, FlushMode, StepStatus, StreamCodec};
//! use compress::deflate::{DeflateDecoder, DeflateEncoder, DeflateFormat};
//!
//! let mut encoder =
//!     DeflateEncoder::new(DeflateFormat::Gzip, CompressionLevel::Default, &DeflateParams::default())?;
//! let mut compressed = [0u8; 128];
//! let step = encoder.step(b"payload", &mut compressed, FlushMode::Finish)?;
//! assert_eq!(step.status, StepStatus::StreamEnd);
//!
//! let mut decoder = DeflateDecoder::new(DeflateFormat::Gzip);
//! let mut plain = [0u8; 16];
//! let step = decoder.step(&compressed[..step.produced], &mut plain, FlushMode::Normal)?;
//! assert_eq!(&plain[..step.produced], b"payload");
//! # Ok::<(), compress::CodecError>(())
//! ```

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use tracing::debug;

use crate::algorithm::CompressionAlgorithm;
use crate::codec::{Direction, FlushMode, Step, StepStatus, StreamCodec};
use crate::config::{
    CompressionLevel, DEFAULT_MEM_LEVEL, DeflateParams, MAX_WINDOW_BITS, MIN_WINDOW_BITS,
    Strategy,
};
use crate::error::CodecError;

/// Framing wrapped around the raw DEFLATE bit stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeflateFormat {
    /// gzip header and CRC-32/ISIZE trailer.
    Gzip,
    /// zlib header and Adler-32 trailer.
    Zlib,
}

impl DeflateFormat {
    /// Maps a DEFLATE-family algorithm to its framing.
    #[must_use]
    pub const fn from_algorithm(algorithm: CompressionAlgorithm) -> Option<Self> {
        match algorithm {
            CompressionAlgorithm::Gzip => Some(Self::Gzip),
            CompressionAlgorithm::Zlib => Some(Self::Zlib),
            #[cfg(feature = "zstd")]
            CompressionAlgorithm::Zstd => None,
            #[cfg(feature = "brotli")]
            CompressionAlgorithm::Brotli => None,
        }
    }

    /// Codec name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
        }
    }
}

/// Checks encoder parameters against what zlib and the flate2 backend accept.
pub fn validate_params(
    format: DeflateFormat,
    level: CompressionLevel,
    params: &DeflateParams,
) -> Result<(), CodecError> {
    let codec = format.name();
    if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&params.window_bits) {
        return Err(CodecError::init(
            codec,
            format!(
                "window bits {} outside {MIN_WINDOW_BITS}..={MAX_WINDOW_BITS}",
                params.window_bits
            ),
        ));
    }
    if !(1..=9).contains(&params.mem_level) {
        return Err(CodecError::init(
            codec,
            format!("memory level {} outside 1..=9", params.mem_level),
        ));
    }
    if params.mem_level != DEFAULT_MEM_LEVEL {
        return Err(CodecError::init(
            codec,
            format!(
                "memory level {} is not supported by the flate2 backend (only {DEFAULT_MEM_LEVEL})",
                params.mem_level
            ),
        ));
    }
    if params.strategy != Strategy::Default {
        return Err(CodecError::init(
            codec,
            format!(
                "strategy {:?} is not supported by the flate2 backend",
                params.strategy
            ),
        ));
    }
    let numeric = level.deflate_level();
    if !(1..=9).contains(&numeric) {
        return Err(CodecError::init(
            codec,
            format!("compression level {numeric} outside 1..=9"),
        ));
    }
    Ok(())
}

/// Incremental DEFLATE compressor.
pub struct DeflateEncoder {
    inner: Compress,
    format: DeflateFormat,
    memory: usize,
}

impl DeflateEncoder {
    /// Creates an encoder; invalid parameters fail with [`CodecError::Init`].
    pub fn new(
        format: DeflateFormat,
        level: CompressionLevel,
        params: &DeflateParams,
    ) -> Result<Self, CodecError> {
        validate_params(format, level, params)?;
        let compression = Compression::new(level.deflate_level());
        let inner = match format {
            DeflateFormat::Gzip => Compress::new_gzip(compression, params.window_bits),
            DeflateFormat::Zlib => {
                Compress::new_with_window_bits(compression, true, params.window_bits)
            }
        };
        debug!(
            target: "streampress::codec",
            codec = format.name(),
            level = level.deflate_level(),
            window_bits = params.window_bits,
            "deflate encoder initialised"
        );
        Ok(Self {
            inner,
            format,
            memory: params.encoder_memory(),
        })
    }
}

impl StreamCodec for DeflateEncoder {
    fn name(&self) -> &'static str {
        self.format.name()
    }

    fn direction(&self) -> Direction {
        Direction::Encode
    }

    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<Step, CodecError> {
        let flush = match flush {
            FlushMode::Normal => FlushCompress::None,
            FlushMode::Finish => FlushCompress::Finish,
        };
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let status = self
            .inner
            .compress(input, output, flush)
            .map_err(|error| CodecError::state(self.format.name(), error.to_string()))?;
        let consumed = (self.inner.total_in() - in_before) as usize;
        let produced = (self.inner.total_out() - out_before) as usize;
        let status = match status {
            Status::StreamEnd => StepStatus::StreamEnd,
            Status::Ok | Status::BufError => StepStatus::Ok,
        };
        Ok(Step::new(consumed, produced, status))
    }

    fn session_memory(&self) -> usize {
        self.memory
    }
}

/// Incremental DEFLATE decompressor.
pub struct DeflateDecoder {
    inner: Decompress,
    format: DeflateFormat,
}

impl DeflateDecoder {
    /// Creates a decoder with the maximum window.
    #[must_use]
    pub fn new(format: DeflateFormat) -> Self {
        let inner = match format {
            DeflateFormat::Gzip => Decompress::new_gzip(MAX_WINDOW_BITS),
            DeflateFormat::Zlib => Decompress::new_with_window_bits(true, MAX_WINDOW_BITS),
        };
        debug!(
            target: "streampress::codec",
            codec = format.name(),
            window_bits = MAX_WINDOW_BITS,
            "deflate decoder initialised"
        );
        Self { inner, format }
    }
}

impl StreamCodec for DeflateDecoder {
    fn name(&self) -> &'static str {
        self.format.name()
    }

    fn direction(&self) -> Direction {
        Direction::Decode
    }

    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        _flush: FlushMode,
    ) -> Result<Step, CodecError> {
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let result = self.inner.decompress(input, output, FlushDecompress::None);
        let consumed = (self.inner.total_in() - in_before) as usize;
        let produced = (self.inner.total_out() - out_before) as usize;
        let status = match result {
            Ok(Status::StreamEnd) => StepStatus::StreamEnd,
            Ok(Status::Ok | Status::BufError) => StepStatus::Ok,
            Err(error) if error.needs_dictionary().is_some() => StepStatus::NeedDictionary,
            Err(error) => return Err(CodecError::data(self.format.name(), error.to_string())),
        };
        Ok(Step::new(consumed, produced, status))
    }

    fn session_memory(&self) -> usize {
        DeflateParams::default().decoder_memory()
    }
}
