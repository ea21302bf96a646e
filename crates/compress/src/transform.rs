//! # Overview
//!
//! The chunked stream transformer. One invocation owns exactly one codec
//! [`Session`] plus two `chunk_size` buffers, and moves bytes
//! `source -> input buffer -> codec step -> output buffer -> destination`
//! until the codec reports the end of the stream.
//!
//! # Encode loop
//!
//! Each outer iteration fills the input buffer (stopping early only at end of
//! the source) and picks [`FlushMode::Finish`] exactly when the source is
//! exhausted. The inner loop steps the codec and drains every produced byte to
//! the destination, continuing while the output buffer came back full or input
//! remains and the step made progress. Every byte of a chunk must be consumed
//! before the next read.
//!
//! # Decode loop
//!
//! Decoding follows the same shape but ignores the flush mode. Success
//! requires an explicit end-of-stream signal from the codec: a source that
//! runs dry first, a decoder that stops making progress, or a stream that asks
//! for a preset dictionary all fail with [`CodecError::Data`]. Bytes after
//! the end of the stream are ignored.
//!
//! # Failure handling
//!
//! Errors abort the transform immediately. The session is released on every
//! path: explicitly on success and by [`Drop`] on error or unwind. A state
//! violation reported by the codec (or detected by the loop) is a programmer
//! error, so the transformer emits a `tracing` error event and panics.

use std::io::{self, Read, Write};

use tracing::{debug, error, trace};

use crate::algorithm::CompressionAlgorithm;
use crate::codec::{Direction, FlushMode, Step, StepStatus, StreamCodec};
use crate::config::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, TransformConfig};
use crate::deflate::{DeflateDecoder, DeflateEncoder, DeflateFormat};
use crate::error::{CodecError, ErrorKind};
use crate::session::Session;

#[cfg(feature = "brotli")]
use crate::brotli::{BrotliDecoder, BrotliEncoder};
#[cfg(feature = "zstd")]
use crate::zstd::{ZstdDecoder, ZstdEncoder};

const TARGET: &str = "streampress::transform";

/// Counters collected by one transform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransformStats {
    /// Direction of the transform.
    pub direction: Direction,
    /// Bytes read from the source.
    pub bytes_read: u64,
    /// Bytes written to the destination.
    pub bytes_written: u64,
    /// Number of source reads into the input buffer.
    pub chunks: u64,
    /// Number of codec steps.
    pub steps: u64,
}

impl TransformStats {
    const fn new(direction: Direction) -> Self {
        Self {
            direction,
            bytes_read: 0,
            bytes_written: 0,
            chunks: 0,
            steps: 0,
        }
    }

    /// Size of the plain side of the transform.
    #[must_use]
    pub const fn plain_bytes(&self) -> u64 {
        match self.direction {
            Direction::Encode => self.bytes_read,
            Direction::Decode => self.bytes_written,
        }
    }

    /// Size of the compressed side of the transform.
    #[must_use]
    pub const fn compressed_bytes(&self) -> u64 {
        match self.direction {
            Direction::Encode => self.bytes_written,
            Direction::Decode => self.bytes_read,
        }
    }

    /// Plain size divided by compressed size; `0.0` for an empty stream.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        let compressed = self.compressed_bytes();
        if compressed == 0 {
            0.0
        } else {
            self.plain_bytes() as f64 / compressed as f64
        }
    }
}

/// Opens a boxed codec for `direction` as described by `config`.
pub fn open_codec(
    config: &TransformConfig,
    direction: Direction,
) -> Result<Box<dyn StreamCodec + Send>, CodecError> {
    match config.algorithm() {
        CompressionAlgorithm::Gzip => open_deflate(DeflateFormat::Gzip, config, direction),
        CompressionAlgorithm::Zlib => open_deflate(DeflateFormat::Zlib, config, direction),
        #[cfg(feature = "zstd")]
        CompressionAlgorithm::Zstd => {
            let codec: Box<dyn StreamCodec + Send> = match direction {
                Direction::Encode => Box::new(ZstdEncoder::new(config.level(), config.zstd())?),
                Direction::Decode => Box::new(ZstdDecoder::new(config.zstd())?),
            };
            Ok(codec)
        }
        #[cfg(feature = "brotli")]
        CompressionAlgorithm::Brotli => {
            let codec: Box<dyn StreamCodec + Send> = match direction {
                Direction::Encode => Box::new(BrotliEncoder::new(config.level(), config.brotli())?),
                Direction::Decode => Box::new(BrotliDecoder::new(config.brotli())?),
            };
            Ok(codec)
        }
    }
}

fn open_deflate(
    format: DeflateFormat,
    config: &TransformConfig,
    direction: Direction,
) -> Result<Box<dyn StreamCodec + Send>, CodecError> {
    let codec: Box<dyn StreamCodec + Send> = match direction {
        Direction::Encode => Box::new(DeflateEncoder::new(format, config.level(), config.deflate())?),
        Direction::Decode => Box::new(DeflateDecoder::new(format)),
    };
    Ok(codec)
}

/// Opens an encoder for `config`.
pub fn open_encoder(config: &TransformConfig) -> Result<Box<dyn StreamCodec + Send>, CodecError> {
    open_codec(config, Direction::Encode)
}

/// Opens a decoder for `config`.
pub fn open_decoder(config: &TransformConfig) -> Result<Box<dyn StreamCodec + Send>, CodecError> {
    open_codec(config, Direction::Decode)
}

/// Drives `codec` over `source` into `destination` with buffers of `chunk_size` bytes.
///
/// The direction comes from the codec. The codec is owned by a [`Session`]
/// for the duration of the call and released before returning, whatever the
/// outcome.
pub fn transform_with<C, R, W>(
    codec: C,
    chunk_size: usize,
    source: &mut R,
    destination: &mut W,
) -> Result<TransformStats, CodecError>
where
    C: StreamCodec,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    check_chunk_size(codec.name(), chunk_size)?;

    let mut session = Session::new(codec);
    debug!(
        target: TARGET,
        codec = session.name(),
        direction = session.direction().as_str(),
        chunk_size,
        "transform started"
    );

    let mut input = vec![0u8; chunk_size];
    let mut output = vec![0u8; chunk_size];
    let result = match session.direction() {
        Direction::Encode => encode_loop(&mut session, &mut input, &mut output, source, destination),
        Direction::Decode => decode_loop(&mut session, &mut input, &mut output, source, destination),
    };

    match &result {
        Ok(stats) => debug!(
            target: TARGET,
            codec = session.name(),
            direction = session.direction().as_str(),
            bytes_read = stats.bytes_read,
            bytes_written = stats.bytes_written,
            chunks = stats.chunks,
            steps = stats.steps,
            "transform finished"
        ),
        Err(error) => debug!(
            target: TARGET,
            codec = session.name(),
            direction = session.direction().as_str(),
            kind = ?error.kind(),
            %error,
            "transform failed"
        ),
    }

    session.release();
    result
}

/// Compresses `source` into `destination` as described by `config`.
pub fn transform_encode<R, W>(
    config: &TransformConfig,
    source: &mut R,
    destination: &mut W,
) -> Result<TransformStats, CodecError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    check_chunk_size(config.algorithm().name(), config.chunk_size())?;
    let codec = open_encoder(config)?;
    transform_with(codec, config.chunk_size(), source, destination)
}

/// Decompresses `source` into `destination` as described by `config`.
pub fn transform_decode<R, W>(
    config: &TransformConfig,
    source: &mut R,
    destination: &mut W,
) -> Result<TransformStats, CodecError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    check_chunk_size(config.algorithm().name(), config.chunk_size())?;
    let codec = open_decoder(config)?;
    transform_with(codec, config.chunk_size(), source, destination)
}

/// A reusable transform configuration.
///
/// Every call to [`encode`](Self::encode) or [`decode`](Self::decode) opens a
/// fresh session and fresh buffers; nothing is shared between calls, so a
/// transformer can be cloned freely across threads.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChunkedTransformer {
    config: TransformConfig,
}

impl ChunkedTransformer {
    /// Creates a transformer for `config`.
    #[must_use]
    pub const fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Configuration used for every transform.
    #[must_use]
    pub const fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Compresses `source` into `destination`.
    pub fn encode<R, W>(&self, source: &mut R, destination: &mut W) -> Result<TransformStats, CodecError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        transform_encode(&self.config, source, destination)
    }

    /// Decompresses `source` into `destination`.
    pub fn decode<R, W>(&self, source: &mut R, destination: &mut W) -> Result<TransformStats, CodecError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        transform_decode(&self.config, source, destination)
    }

    /// Runs the transform in `direction`.
    pub fn run<R, W>(
        &self,
        direction: Direction,
        source: &mut R,
        destination: &mut W,
    ) -> Result<TransformStats, CodecError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        match direction {
            Direction::Encode => self.encode(source, destination),
            Direction::Decode => self.decode(source, destination),
        }
    }
}

/// Compresses an in-memory buffer through the chunked transform.
pub fn compress_to_vec(input: &[u8], config: &TransformConfig) -> Result<Vec<u8>, CodecError> {
    let mut source = input;
    let mut output = Vec::new();
    transform_encode(config, &mut source, &mut output)?;
    Ok(output)
}

/// Decompresses an in-memory buffer through the chunked transform.
pub fn decompress_to_vec(input: &[u8], config: &TransformConfig) -> Result<Vec<u8>, CodecError> {
    let mut source = input;
    let mut output = Vec::new();
    transform_decode(config, &mut source, &mut output)?;
    Ok(output)
}

fn check_chunk_size(codec: &'static str, chunk_size: usize) -> Result<(), CodecError> {
    if (MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
        Ok(())
    } else {
        Err(CodecError::init(
            codec,
            format!("chunk size {chunk_size} outside {MIN_CHUNK_SIZE}..={MAX_CHUNK_SIZE}"),
        ))
    }
}

fn encode_loop<C, R, W>(
    session: &mut Session<C>,
    input: &mut [u8],
    output: &mut [u8],
    source: &mut R,
    destination: &mut W,
) -> Result<TransformStats, CodecError>
where
    C: StreamCodec,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut stats = TransformStats::new(Direction::Encode);

    loop {
        let (filled, exhausted) = fill_chunk(source, input)?;
        stats.bytes_read += filled as u64;
        stats.chunks += 1;
        let flush = if exhausted {
            FlushMode::Finish
        } else {
            FlushMode::Normal
        };
        trace!(target: TARGET, filled, finish = exhausted, "chunk read");

        let mut offset = 0;
        let mut ended = false;
        loop {
            let step = checked_step(session, &input[offset..filled], output, flush)?;
            offset += step.consumed;
            stats.steps += 1;
            drain(destination, &output[..step.produced], &mut stats)?;

            if step.status == StepStatus::StreamEnd {
                if flush != FlushMode::Finish || offset != filled {
                    state_violation(session.name(), "stream ended before the source was exhausted");
                }
                ended = true;
                break;
            }
            if step.status == StepStatus::NeedDictionary {
                state_violation(session.name(), "encoder requested a dictionary");
            }

            let output_full = step.produced == output.len();
            let pending = offset < filled || flush == FlushMode::Finish;
            if output_full || (pending && !step.is_stalled()) {
                continue;
            }
            break;
        }

        if offset != filled {
            state_violation(session.name(), "encoder left input unconsumed");
        }
        if ended {
            break;
        }
        if exhausted {
            state_violation(session.name(), "finish did not reach the end of the stream");
        }
    }

    destination.flush().map_err(CodecError::write)?;
    Ok(stats)
}

fn decode_loop<C, R, W>(
    session: &mut Session<C>,
    input: &mut [u8],
    output: &mut [u8],
    source: &mut R,
    destination: &mut W,
) -> Result<TransformStats, CodecError>
where
    C: StreamCodec,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut stats = TransformStats::new(Direction::Decode);

    loop {
        let (filled, exhausted) = fill_chunk(source, input)?;
        stats.bytes_read += filled as u64;
        stats.chunks += 1;
        trace!(target: TARGET, filled, exhausted, "chunk read");

        let mut offset = 0;
        let mut ended = false;
        loop {
            let step = checked_step(session, &input[offset..filled], output, FlushMode::Normal)?;
            offset += step.consumed;
            stats.steps += 1;
            drain(destination, &output[..step.produced], &mut stats)?;

            match step.status {
                StepStatus::StreamEnd => {
                    ended = true;
                    break;
                }
                StepStatus::NeedDictionary => {
                    return Err(CodecError::data(
                        session.name(),
                        "stream requires a preset dictionary",
                    ));
                }
                StepStatus::Ok => {}
            }

            if step.produced == output.len() {
                continue;
            }
            if offset < filled {
                if step.is_stalled() {
                    return Err(CodecError::data(
                        session.name(),
                        "decoder made no progress on remaining input",
                    ));
                }
                continue;
            }
            break;
        }

        if ended {
            if offset < filled || !exhausted {
                trace!(target: TARGET, "ignoring bytes after the end of the stream");
            }
            break;
        }
        if exhausted {
            return Err(CodecError::data(
                session.name(),
                "stream truncated before its end marker",
            ));
        }
    }

    destination.flush().map_err(CodecError::write)?;
    Ok(stats)
}

/// Reads until `buffer` is full or the source is exhausted.
///
/// Returns the number of bytes read and whether end of stream was seen.
fn fill_chunk<R>(source: &mut R, buffer: &mut [u8]) -> Result<(usize, bool), CodecError>
where
    R: Read + ?Sized,
{
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]) {
            Ok(0) => return Ok((filled, true)),
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(CodecError::read(error)),
        }
    }
    Ok((filled, false))
}

fn drain<W>(destination: &mut W, bytes: &[u8], stats: &mut TransformStats) -> Result<(), CodecError>
where
    W: Write + ?Sized,
{
    if bytes.is_empty() {
        return Ok(());
    }
    destination.write_all(bytes).map_err(CodecError::write)?;
    stats.bytes_written += bytes.len() as u64;
    Ok(())
}

fn checked_step<C: StreamCodec>(
    session: &mut Session<C>,
    input: &[u8],
    output: &mut [u8],
    flush: FlushMode,
) -> Result<Step, CodecError> {
    match session.step(input, output, flush) {
        Ok(step) => Ok(step),
        Err(error) if error.kind() == ErrorKind::State => {
            state_violation(session.name(), &error.to_string())
        }
        Err(error) => Err(error),
    }
}

#[cold]
fn state_violation(codec: &str, reason: &str) -> ! {
    error!(target: TARGET, codec, reason, "codec state violation");
    panic!("{codec}: codec state violation: {reason}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CHUNK_SIZE;

    #[test]
    fn stats_ratio_uses_plain_over_compressed() {
        let stats = TransformStats {
            direction: Direction::Encode,
            bytes_read: 1000,
            bytes_written: 250,
            chunks: 1,
            steps: 2,
        };
        assert!((stats.ratio() - 4.0).abs() < f64::EPSILON);

        let decoded = TransformStats {
            direction: Direction::Decode,
            bytes_read: 250,
            bytes_written: 1000,
            ..stats
        };
        assert!((decoded.ratio() - 4.0).abs() < f64::EPSILON);
        assert!(TransformStats::new(Direction::Encode).ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn zero_chunk_size_is_an_init_error() {
        let config = TransformConfig::default().with_chunk_size(0);
        let err = compress_to_vec(b"data", &config).expect_err("zero chunk rejected");
        assert_eq!(err.kind(), ErrorKind::Init);
    }

    #[test]
    fn oversized_chunk_size_is_an_init_error() {
        let config = TransformConfig::default().with_chunk_size(MAX_CHUNK_SIZE + 1);
        let err = decompress_to_vec(b"data", &config).expect_err("huge chunk rejected");
        assert_eq!(err.kind(), ErrorKind::Init);
    }

    #[test]
    fn fill_chunk_retries_interrupted_reads() {
        struct Flaky {
            interrupted: bool,
            data: &'static [u8],
        }

        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::Error::from(io::ErrorKind::Interrupted));
                }
                self.data.read(buf)
            }
        }

        let mut source = Flaky {
            interrupted: false,
            data: b"abc",
        };
        let mut buffer = [0u8; 8];
        let (filled, exhausted) = fill_chunk(&mut source, &mut buffer).expect("fill");
        assert_eq!(filled, 3);
        assert!(exhausted);
        assert_eq!(&buffer[..3], b"abc");
    }

    #[test]
    fn full_buffer_is_not_reported_as_exhausted() {
        let mut source: &[u8] = b"abcd";
        let mut buffer = [0u8; 4];
        let (filled, exhausted) = fill_chunk(&mut source, &mut buffer).expect("fill");
        assert_eq!(filled, 4);
        assert!(!exhausted);
    }

    #[test]
    fn gzip_round_trip_with_default_config() {
        let config = TransformConfig::new(CompressionAlgorithm::Gzip);
        assert_eq!(config.chunk_size(), DEFAULT_CHUNK_SIZE);
        let compressed = compress_to_vec(b"hello hello hello", &config).expect("compress");
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        let plain = decompress_to_vec(&compressed, &config).expect("decompress");
        assert_eq!(plain, b"hello hello hello");
    }

    #[test]
    fn transformer_runs_in_either_direction() {
        let transformer =
            ChunkedTransformer::new(TransformConfig::new(CompressionAlgorithm::Zlib).with_chunk_size(3));
        let mut compressed = Vec::new();
        let stats = transformer
            .run(Direction::Encode, &mut &b"abcdefgh"[..], &mut compressed)
            .expect("encode");
        assert_eq!(stats.bytes_read, 8);
        assert_eq!(stats.bytes_written, compressed.len() as u64);
        assert_eq!(stats.chunks, 3);

        let mut plain = Vec::new();
        let stats = transformer
            .run(Direction::Decode, &mut compressed.as_slice(), &mut plain)
            .expect("decode");
        assert_eq!(plain, b"abcdefgh");
        assert_eq!(stats.plain_bytes(), 8);
    }

    #[test]
    fn trailing_bytes_after_stream_end_are_ignored() {
        let config = TransformConfig::new(CompressionAlgorithm::Gzip);
        let mut compressed = compress_to_vec(b"payload", &config).expect("compress");
        compressed.extend_from_slice(b"trailing garbage");
        let plain = decompress_to_vec(&compressed, &config).expect("decompress");
        assert_eq!(plain, b"payload");
    }
}
