//! Transform configuration and the build-time defaults it starts from.
//!
//! Every limit here exists to bound peak memory: the transformer allocates
//! exactly two buffers of [`TransformConfig::chunk_size`] bytes, and the codec
//! session's working memory follows from the window and memory-level settings.
//! [`TransformConfig::peak_memory`] spells that total out so it can be checked
//! against a device budget.
//!
//! Values are validated when a session is created rather than when the
//! configuration is built; invalid combinations surface as
//! [`CodecError::Init`](crate::CodecError::Init).

use std::fmt;
use std::num::NonZeroU8;

use crate::algorithm::CompressionAlgorithm;
use crate::codec::Direction;

/// Default size in bytes of the input and output buffers.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Smallest accepted chunk size.
pub const MIN_CHUNK_SIZE: usize = 1;

/// Largest accepted chunk size.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Default DEFLATE window size, as a base-two logarithm.
pub const DEFAULT_WINDOW_BITS: u8 = 15;

/// Smallest DEFLATE window flate2 accepts.
pub const MIN_WINDOW_BITS: u8 = 9;

/// Largest DEFLATE window.
pub const MAX_WINDOW_BITS: u8 = 15;

/// zlib's default `memLevel`, the only value the flate2 backend applies.
pub const DEFAULT_MEM_LEVEL: u8 = 8;

/// Default Zstandard window size, as a base-two logarithm.
pub const DEFAULT_ZSTD_WINDOW_LOG: u32 = 20;

/// Smallest Zstandard window log.
pub const MIN_ZSTD_WINDOW_LOG: u32 = 10;

/// Largest Zstandard window log accepted on 32- and 64-bit targets alike.
///
/// This is also zstd's own default decoder limit, so frames written by other
/// zstd tools decode with the default configuration.
pub const MAX_ZSTD_WINDOW_LOG: u32 = 27;

/// Default cap on the Zstandard hash and chain tables, as a base-two logarithm.
pub const DEFAULT_ZSTD_TABLE_LOG: u32 = 17;

/// Smallest Zstandard table log.
pub const MIN_ZSTD_TABLE_LOG: u32 = 6;

/// Largest Zstandard table log.
pub const MAX_ZSTD_TABLE_LOG: u32 = 24;

/// Default Brotli window size, as a base-two logarithm.
pub const DEFAULT_BROTLI_LGWIN: u32 = 22;

/// Smallest Brotli window.
pub const MIN_BROTLI_LGWIN: u32 = 10;

/// Largest Brotli window without the large-window extension.
pub const MAX_BROTLI_LGWIN: u32 = 24;

/// Highest Brotli quality accepted.
///
/// Qualities 10 and 11 switch to the Zopfli parser, whose working memory
/// grows with the metablock rather than the window.
pub const MAX_BROTLI_QUALITY: u32 = 9;

const ZSTD_BLOCK_SIZE_MAX: usize = 128 * 1024;
const ZSTD_OPTIMAL_PARSER: usize = 160 * 1024;
const ZSTD_CCTX_OVERHEAD: usize = 64 * 1024;
const ZSTD_DCTX_OVERHEAD: usize = 192 * 1024;

/// Input bytes after which the Brotli encoder forces a metablock out.
pub(crate) const BROTLI_METABLOCK_INPUT: usize = 256 * 1024;
const BROTLI_BYTES_PER_METABLOCK_BYTE: usize = 48;
const BROTLI_HISTOGRAMS: usize = 8 * 1024 * 1024;
const BROTLI_TWO_PASS_BLOCK: usize = 128 * 1024;
const BROTLI_STATE_OVERHEAD: usize = 256 * 1024;
const BROTLI_HUFFMAN_TABLES: usize = 4 * 1024 * 1024;

/// Compression levels recognised by the encoders.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompressionLevel {
    /// Favour speed over compression ratio.
    Fast,
    /// Use the codec's default balance between speed and ratio.
    #[default]
    Default,
    /// Favour the best possible compression ratio.
    Best,
    /// Use an explicit compression level in the range `1..=9`.
    Precise(NonZeroU8),
}

impl CompressionLevel {
    /// Creates a [`CompressionLevel::Precise`] value from an explicit numeric level.
    ///
    /// The supplied `level` must fall within the inclusive range `1..=9`.
    pub fn from_numeric(level: u32) -> Result<Self, CompressionLevelError> {
        u8::try_from(level)
            .ok()
            .filter(|value| (1..=9).contains(value))
            .and_then(NonZeroU8::new)
            .map(Self::Precise)
            .ok_or(CompressionLevelError::new(level))
    }

    /// Constructs a [`CompressionLevel::Precise`] variant from the provided level.
    #[must_use]
    pub const fn precise(level: NonZeroU8) -> Self {
        Self::Precise(level)
    }

    /// Returns the zlib level (`1..=9`) this setting maps to.
    #[must_use]
    pub const fn deflate_level(self) -> u32 {
        match self {
            Self::Fast => 1,
            Self::Default => 6,
            Self::Best => 9,
            Self::Precise(value) => value.get() as u32,
        }
    }

    /// Returns the Brotli quality (`1..=9`) this setting maps to.
    #[must_use]
    pub const fn brotli_quality(self) -> u32 {
        match self {
            Self::Fast => 1,
            Self::Default => 5,
            Self::Best => MAX_BROTLI_QUALITY,
            Self::Precise(value) => value.get() as u32,
        }
    }

    /// Returns the Zstandard level this setting maps to.
    #[must_use]
    pub const fn zstd_level(self) -> i32 {
        match self {
            Self::Fast => 1,
            Self::Default => 3,
            Self::Best => 19,
            Self::Precise(value) => value.get() as i32,
        }
    }
}

/// Error returned when a requested compression level falls outside `1..=9`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompressionLevelError {
    level: u32,
}

impl CompressionLevelError {
    const fn new(level: u32) -> Self {
        Self { level }
    }

    /// Returns the invalid compression level that triggered the error.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

impl fmt::Display for CompressionLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compression level {} is outside the supported range 1-9",
            self.level
        )
    }
}

impl std::error::Error for CompressionLevelError {}

/// zlib compression strategies.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strategy {
    /// `Z_DEFAULT_STRATEGY`.
    #[default]
    Default,
    /// `Z_FILTERED`.
    Filtered,
    /// `Z_HUFFMAN_ONLY`.
    HuffmanOnly,
    /// `Z_RLE`.
    Rle,
    /// `Z_FIXED`.
    Fixed,
}

/// Parameters for DEFLATE-family sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeflateParams {
    /// Window size as a base-two logarithm (`9..=15`).
    pub window_bits: u8,
    /// zlib `memLevel` (`1..=9`).
    pub mem_level: u8,
    /// zlib compression strategy.
    pub strategy: Strategy,
}

impl Default for DeflateParams {
    fn default() -> Self {
        Self {
            window_bits: DEFAULT_WINDOW_BITS,
            mem_level: DEFAULT_MEM_LEVEL,
            strategy: Strategy::Default,
        }
    }
}

impl DeflateParams {
    /// zlib's documented deflate state size: `(1 << (windowBits + 2)) + (1 << (memLevel + 9))`.
    #[must_use]
    pub const fn encoder_memory(&self) -> usize {
        (1 << (self.window_bits as usize + 2)) + (1 << (self.mem_level as usize + 9))
    }

    /// zlib's documented inflate state size for the maximum window: 32 KiB plus about 7 KiB.
    #[must_use]
    pub const fn decoder_memory(&self) -> usize {
        (1 << MAX_WINDOW_BITS as usize) + 7 * 1024
    }
}

/// Parameters for Zstandard sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZstdParams {
    /// Encoder window size as a base-two logarithm.
    pub window_log: u32,
    /// Largest window a decoder accepts, as a base-two logarithm.
    pub window_log_max: u32,
    /// Cap on the encoder's hash and chain tables, as a base-two logarithm.
    pub table_log: u32,
    /// Append a content checksum to each frame.
    pub checksum: bool,
}

impl Default for ZstdParams {
    fn default() -> Self {
        Self {
            window_log: DEFAULT_ZSTD_WINDOW_LOG,
            window_log_max: MAX_ZSTD_WINDOW_LOG,
            table_log: DEFAULT_ZSTD_TABLE_LOG,
            checksum: true,
        }
    }
}

const fn zstd_block_size(window_log: u32) -> usize {
    let window = 1usize << window_log;
    if window < ZSTD_BLOCK_SIZE_MAX {
        window
    } else {
        ZSTD_BLOCK_SIZE_MAX
    }
}

impl ZstdParams {
    /// Hash and chain log applied to the encoder.
    ///
    /// Tables wider than the window plus one bit never find more matches, so
    /// the cap shrinks along with small windows.
    #[must_use]
    pub const fn effective_table_log(&self) -> u32 {
        if self.table_log > self.window_log + 1 {
            self.window_log + 1
        } else {
            self.table_log
        }
    }

    /// Upper bound of the compression context at any level.
    ///
    /// Counts the window buffer plus one block, the block output buffer, the
    /// hash, chain and three-byte hash tables with row tags, the sequence
    /// store, the optimal parser's price tables and the fixed context state.
    #[must_use]
    pub const fn encoder_memory(&self) -> usize {
        let window = 1usize << self.window_log;
        let block = zstd_block_size(self.window_log);
        let tables = 1usize << self.effective_table_log();
        let hash3 = if self.window_log < 17 {
            1usize << self.window_log
        } else {
            1usize << 17
        };
        let buffers = window + block + block + block / 128 + 1024;
        let matching = 4 * (2 * tables + hash3) + 2 * tables;
        let sequences = block + 32 + 11 * block / 3 + 64;
        buffers + matching + sequences + ZSTD_OPTIMAL_PARSER + ZSTD_CCTX_OVERHEAD
    }

    /// Upper bound of the decompression context for the largest accepted window.
    ///
    /// The decoder keeps the window plus two blocks of history, one input
    /// block and its fixed entropy tables.
    #[must_use]
    pub const fn decoder_memory(&self) -> usize {
        (1usize << self.window_log_max) + 3 * zstd_block_size(self.window_log_max) + ZSTD_DCTX_OVERHEAD
    }
}

/// Parameters for Brotli sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrotliParams {
    /// Encoder window size as a base-two logarithm (`10..=24`).
    pub lgwin: u32,
    /// Explicit quality (`0..=9`); `None` derives it from the compression level.
    pub quality: Option<u32>,
}

impl Default for BrotliParams {
    fn default() -> Self {
        Self {
            lgwin: DEFAULT_BROTLI_LGWIN,
            quality: None,
        }
    }
}

impl BrotliParams {
    /// Quality the encoder runs at for `level`.
    #[must_use]
    pub const fn quality(&self, level: CompressionLevel) -> u32 {
        match self.quality {
            Some(quality) => quality,
            None => level.brotli_quality(),
        }
    }

    /// Upper estimate of the encoder's heap at `quality`.
    ///
    /// Qualities 0 and 1 compress each input block directly. Higher qualities
    /// keep a ring buffer of twice the window plus one input block, a hasher
    /// whose size depends on the quality, and per-metablock command and block
    /// split state. Metablocks are flushed every
    /// `BROTLI_METABLOCK_INPUT` bytes, which bounds the latter.
    #[must_use]
    pub const fn encoder_memory(&self, quality: u32) -> usize {
        let window = 1usize << self.lgwin;
        if quality <= 1 {
            let table = if quality == 0 { 1usize << 15 } else { 1usize << 17 };
            let two_pass = if quality == 1 { 5 * BROTLI_TWO_PASS_BLOCK } else { 0 };
            return 4 * table + two_pass + 2 * window + 503 + BROTLI_STATE_OVERHEAD;
        }

        let lgblock = if quality < 4 {
            14
        } else if quality >= 9 && self.lgwin > 16 {
            if self.lgwin < 18 { self.lgwin } else { 18 }
        } else {
            16
        };
        let rb_bits = 1 + if self.lgwin > lgblock { self.lgwin } else { lgblock };
        let ring = (1usize << rb_bits) + (1usize << lgblock) + 9;
        let metablock = BROTLI_METABLOCK_INPUT + (1usize << lgblock);
        ring + brotli_hasher_memory(quality, self.lgwin)
            + BROTLI_BYTES_PER_METABLOCK_BYTE * metablock
            + BROTLI_HISTOGRAMS
            + BROTLI_STATE_OVERHEAD
    }

    /// Upper estimate of the decoder's heap for the largest standard window.
    #[must_use]
    pub const fn decoder_memory(&self) -> usize {
        (1usize << MAX_BROTLI_LGWIN) + BROTLI_HUFFMAN_TABLES
    }
}

/// Bytes held by the match finder the Brotli encoder picks for `quality`.
const fn brotli_hasher_memory(quality: u32, lgwin: u32) -> usize {
    // Buckets of u32 positions plus one u16 fill counter per bucket.
    const fn buckets(bucket_bits: u32, block_bits: u32) -> usize {
        4 * (1usize << (bucket_bits + block_bits)) + 2 * (1usize << bucket_bits)
    }
    match quality {
        2 | 3 => 4 * (65538 + 8),
        4 => 4 * (131072 + 8),
        5..=8 if lgwin > 16 => {
            let bucket_bits = if quality < 7 { 14 } else { 15 };
            buckets(bucket_bits, quality - 1)
        }
        _ => buckets(15, 8),
    }
}

/// Complete configuration for one chunked transform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformConfig {
    algorithm: CompressionAlgorithm,
    chunk_size: usize,
    level: CompressionLevel,
    deflate: DeflateParams,
    zstd: ZstdParams,
    brotli: BrotliParams,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self::new(CompressionAlgorithm::default_algorithm())
    }
}

impl TransformConfig {
    /// Creates a configuration for `algorithm` with the build-time defaults.
    #[must_use]
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
            level: CompressionLevel::Default,
            deflate: DeflateParams::default(),
            zstd: ZstdParams::default(),
            brotli: BrotliParams::default(),
        }
    }

    /// Selects the stream format.
    pub fn with_algorithm(mut self, algorithm: CompressionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the size of both I/O buffers.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the compression level used by encoders.
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Replaces the DEFLATE parameters.
    pub fn with_deflate(mut self, deflate: DeflateParams) -> Self {
        self.deflate = deflate;
        self
    }

    /// Replaces the Zstandard parameters.
    pub fn with_zstd(mut self, zstd: ZstdParams) -> Self {
        self.zstd = zstd;
        self
    }

    /// Replaces the Brotli parameters.
    pub fn with_brotli(mut self, brotli: BrotliParams) -> Self {
        self.brotli = brotli;
        self
    }

    /// Selected stream format.
    #[must_use]
    pub const fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Size in bytes of each of the two buffers.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Compression level for encoders.
    #[must_use]
    pub const fn level(&self) -> CompressionLevel {
        self.level
    }

    /// DEFLATE parameters.
    #[must_use]
    pub const fn deflate(&self) -> &DeflateParams {
        &self.deflate
    }

    /// Zstandard parameters.
    #[must_use]
    pub const fn zstd(&self) -> &ZstdParams {
        &self.zstd
    }

    /// Brotli parameters.
    #[must_use]
    pub const fn brotli(&self) -> &BrotliParams {
        &self.brotli
    }

    /// Returns `true` when the chunk size lies within `MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE`.
    #[must_use]
    pub const fn chunk_size_is_valid(&self) -> bool {
        self.chunk_size >= MIN_CHUNK_SIZE && self.chunk_size <= MAX_CHUNK_SIZE
    }

    /// Estimated working memory of the codec session for `direction`.
    #[must_use]
    pub const fn session_memory(&self, direction: Direction) -> usize {
        match self.algorithm {
            CompressionAlgorithm::Gzip | CompressionAlgorithm::Zlib => match direction {
                Direction::Encode => self.deflate.encoder_memory(),
                Direction::Decode => self.deflate.decoder_memory(),
            },
            #[cfg(feature = "zstd")]
            CompressionAlgorithm::Zstd => match direction {
                Direction::Encode => self.zstd.encoder_memory(),
                Direction::Decode => self.zstd.decoder_memory(),
            },
            #[cfg(feature = "brotli")]
            CompressionAlgorithm::Brotli => match direction {
                Direction::Encode => self.brotli.encoder_memory(self.brotli.quality(self.level)),
                Direction::Decode => self.brotli.decoder_memory(),
            },
        }
    }

    /// Peak memory of one transform: both buffers plus the session estimate.
    #[must_use]
    pub const fn peak_memory(&self, direction: Direction) -> usize {
        2 * self.chunk_size + self.session_memory(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_level_constructor_accepts_valid_range() {
        for level in 1..=9 {
            let precise = CompressionLevel::from_numeric(level).expect("valid level");
            assert_eq!(precise.deflate_level(), level);
        }
    }

    #[test]
    fn numeric_level_constructor_rejects_out_of_range() {
        let err = CompressionLevel::from_numeric(10).expect_err("level above 9 rejected");
        assert_eq!(err.level(), 10);
        let err = CompressionLevel::from_numeric(0).expect_err("level zero rejected");
        assert_eq!(err.level(), 0);
        assert!(CompressionLevel::from_numeric(u32::MAX).is_err());
    }

    #[test]
    fn named_levels_map_to_codec_levels() {
        assert_eq!(CompressionLevel::Fast.deflate_level(), 1);
        assert_eq!(CompressionLevel::Best.deflate_level(), 9);
        assert_eq!(CompressionLevel::Default.zstd_level(), 3);
        assert_eq!(CompressionLevel::Best.zstd_level(), 19);
    }

    #[test]
    fn default_gzip_peak_memory_matches_zlib_formula() {
        let config = TransformConfig::default();
        assert_eq!(config.chunk_size(), DEFAULT_CHUNK_SIZE);
        // (1 << 17) + (1 << 17) for windowBits 15 and memLevel 8.
        assert_eq!(config.session_memory(Direction::Encode), 262_144);
        assert_eq!(config.peak_memory(Direction::Encode), 262_144 + 32_768);
        assert_eq!(config.peak_memory(Direction::Decode), 32_768 + 39_936);
    }

    #[test]
    fn smaller_window_shrinks_encoder_memory() {
        let config = TransformConfig::default().with_deflate(DeflateParams {
            window_bits: 10,
            ..DeflateParams::default()
        });
        assert_eq!(config.session_memory(Direction::Encode), 4096 + 131_072);
    }

    #[test]
    fn zstd_tables_never_exceed_window_plus_one() {
        let narrow = ZstdParams {
            window_log: 10,
            ..ZstdParams::default()
        };
        assert_eq!(narrow.effective_table_log(), 11);
        assert_eq!(ZstdParams::default().effective_table_log(), DEFAULT_ZSTD_TABLE_LOG);
        assert!(narrow.encoder_memory() < ZstdParams::default().encoder_memory());
    }

    #[test]
    fn zstd_decoder_memory_follows_the_window_limit() {
        let default = ZstdParams::default();
        assert!(default.decoder_memory() > 1 << MAX_ZSTD_WINDOW_LOG);
        let capped = ZstdParams {
            window_log_max: 20,
            ..default
        };
        assert_eq!(capped.decoder_memory(), (1 << 20) + 3 * 128 * 1024 + 192 * 1024);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_peak_memory_adds_both_buffers() {
        let config = TransformConfig::new(CompressionAlgorithm::Zstd).with_chunk_size(4096);
        assert_eq!(
            config.peak_memory(Direction::Encode),
            8192 + config.zstd().encoder_memory()
        );
        assert_eq!(
            config.peak_memory(Direction::Decode),
            8192 + config.zstd().decoder_memory()
        );
    }

    #[test]
    fn brotli_quality_follows_level_unless_pinned() {
        let params = BrotliParams::default();
        assert_eq!(params.quality(CompressionLevel::Fast), 1);
        assert_eq!(params.quality(CompressionLevel::Default), 5);
        assert_eq!(params.quality(CompressionLevel::Best), MAX_BROTLI_QUALITY);
        let pinned = BrotliParams {
            quality: Some(0),
            ..params
        };
        assert_eq!(pinned.quality(CompressionLevel::Best), 0);
    }

    #[test]
    fn brotli_encoder_memory_grows_with_window_and_quality() {
        let small = BrotliParams {
            lgwin: 18,
            quality: None,
        };
        let large = BrotliParams::default();
        for quality in 0..=MAX_BROTLI_QUALITY {
            assert!(small.encoder_memory(quality) <= large.encoder_memory(quality));
            assert!(large.encoder_memory(quality) >= 2 << DEFAULT_BROTLI_LGWIN);
        }
        assert!(large.encoder_memory(9) > large.encoder_memory(5));
    }

    #[test]
    fn chunk_size_bounds() {
        assert!(TransformConfig::default().chunk_size_is_valid());
        assert!(!TransformConfig::default().with_chunk_size(0).chunk_size_is_valid());
        assert!(
            !TransformConfig::default()
                .with_chunk_size(MAX_CHUNK_SIZE + 1)
                .chunk_size_is_valid()
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_survives_json() {
        let config = TransformConfig::default()
            .with_chunk_size(4096)
            .with_level(CompressionLevel::Best);
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(json.contains("\"gzip\""));
        let parsed: TransformConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, config);
    }
}
