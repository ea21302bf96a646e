#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `compress` streams bytes through a compression library without ever
//! holding a whole file in memory. It owns the parts the libraries leave to
//! the caller: the two fixed-size I/O buffers, the chunked read/step/write
//! loop, the flush/finish state machine, error mapping, and guaranteed release
//! of the codec session.
//!
//! # Design
//!
//! - [`codec`] defines [`StreamCodec`], the step-function interface shared by
//!   every adapter.
//! - [`deflate`], [`zstd`] and [`brotli`] adapt
//!   [`flate2`](https://docs.rs/flate2), [`zstd`](https://docs.rs/zstd) and
//!   [`brotli`](https://docs.rs/brotli) streams to that interface.
//! - [`session`] wraps one codec in a [`Session`] that is released exactly
//!   once, including during unwinding.
//! - [`transform`] runs the chunked loop and exposes
//!   [`transform_encode`] / [`transform_decode`] plus in-memory helpers.
//! - [`config`] holds compile-time defaults, [`TransformConfig`] and the
//!   peak-memory formula.
//!
//! # Invariants
//!
//! - Peak memory of a transform is `2 * chunk_size` plus the codec's session
//!   memory; see [`TransformConfig::peak_memory`].
//! - Every byte read from the source is offered to the codec before the next
//!   read, and every produced byte is written before the next step.
//! - A decode only succeeds once the codec reports the end of the stream.
//!
//! # Errors
//!
//! Fallible operations return [`CodecError`], whose [`kind`](CodecError::kind)
//! distinguishes initialisation, I/O, data, memory and state failures. State
//! failures indicate misuse of a codec; the transformer logs them and panics.
//!
//! # Examples
//!
//! ```
//! use compress::{CompressionAlgorithm, TransformConfig, compress_to_vec, decompress_to_vec};
//!
//! let config = TransformConfig::new(CompressionAlgorithm::Gzip).with_chunk_size(1024);
//! let data = b"streaming example payload ".repeat(64);
//! let compressed = compress_to_vec(&data, &config)?;
//! assert!(compressed.len() < data.len());
//! assert_eq!(decompress_to_vec(&compressed, &config)?, data);
//! # Ok::<(), compress::CodecError>(())
//! ```

#[cfg(not(any(feature = "zlib-rs", feature = "zlib-ng")))]
compile_error!("compress needs a zlib backend: enable the `zlib-rs` or `zlib-ng` feature");

pub mod algorithm;
#[cfg(feature = "brotli")]
pub mod brotli;
pub mod codec;
pub mod config;
pub mod deflate;
pub mod error;
pub mod session;
pub mod transform;
#[cfg(feature = "zstd")]
pub mod zstd;

pub use algorithm::{CompressionAlgorithm, CompressionAlgorithmParseError};
pub use codec::{Direction, FlushMode, Step, StepStatus, StreamCodec};
pub use config::{
    BrotliParams, CompressionLevel, CompressionLevelError, DEFAULT_CHUNK_SIZE, DeflateParams, MAX_CHUNK_SIZE,
    MIN_CHUNK_SIZE, Strategy, TransformConfig, ZstdParams,
};
pub use error::{CodecError, ErrorKind, IoStage};
pub use session::Session;
pub use transform::{
    ChunkedTransformer, TransformStats, compress_to_vec, decompress_to_vec, open_codec,
    open_decoder, open_encoder, transform_decode, transform_encode, transform_with,
};
