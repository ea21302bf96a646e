//! Error taxonomy shared by the codec adapters and the chunked transformer.

use std::fmt;
use std::io;

use thiserror::Error;

/// Side of the pipeline on which an I/O failure happened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IoStage {
    /// Reading a chunk from the source stream.
    Read,
    /// Writing produced bytes to the destination stream.
    Write,
}

impl fmt::Display for IoStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("reading source"),
            Self::Write => f.write_str("writing destination"),
        }
    }
}

/// Coarse classification of a [`CodecError`], used for exit codes and tests.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Codec parameters were rejected when the session was created.
    Init,
    /// The source or destination stream failed.
    Io,
    /// The compressed stream is malformed, truncated, or needs a dictionary.
    Data,
    /// The codec could not allocate its working memory.
    Memory,
    /// The codec reported an internal consistency violation.
    State,
}

/// Errors produced while creating or stepping a codec session.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Invalid parameters for the codec implementation.
    #[error("invalid {codec} parameters: {reason}")]
    Init {
        /// Codec that rejected the parameters.
        codec: &'static str,
        /// Human readable explanation.
        reason: String,
    },

    /// The source or destination stream reported an error.
    #[error("{stage} failed: {source}")]
    Io {
        /// Which side of the pipeline failed.
        stage: IoStage,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The compressed stream could not be decoded.
    #[error("corrupt {codec} stream: {reason}")]
    Data {
        /// Codec that rejected the stream.
        codec: &'static str,
        /// Human readable explanation.
        reason: String,
    },

    /// The codec ran out of memory for its internal tables.
    #[error("{codec} could not allocate its working memory")]
    Memory {
        /// Codec that failed to allocate.
        codec: &'static str,
    },

    /// Internal consistency violation inside the codec or the transform loop.
    #[error("{codec} session state violated: {reason}")]
    State {
        /// Codec whose state was violated.
        codec: &'static str,
        /// Human readable explanation.
        reason: String,
    },
}

impl CodecError {
    /// Creates an [`CodecError::Init`] error.
    pub fn init(codec: &'static str, reason: impl Into<String>) -> Self {
        Self::Init {
            codec,
            reason: reason.into(),
        }
    }

    /// Creates an [`CodecError::Data`] error.
    pub fn data(codec: &'static str, reason: impl Into<String>) -> Self {
        Self::Data {
            codec,
            reason: reason.into(),
        }
    }

    /// Creates an [`CodecError::State`] error.
    pub fn state(codec: &'static str, reason: impl Into<String>) -> Self {
        Self::State {
            codec,
            reason: reason.into(),
        }
    }

    /// Wraps a source read failure.
    pub fn read(source: io::Error) -> Self {
        Self::Io {
            stage: IoStage::Read,
            source,
        }
    }

    /// Wraps a destination write failure.
    pub fn write(source: io::Error) -> Self {
        Self::Io {
            stage: IoStage::Write,
            source,
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Init { .. } => ErrorKind::Init,
            Self::Io { .. } => ErrorKind::Io,
            Self::Data { .. } => ErrorKind::Data,
            Self::Memory { .. } => ErrorKind::Memory,
            Self::State { .. } => ErrorKind::State,
        }
    }
}

impl From<CodecError> for io::Error {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Io { source, .. } => source,
            CodecError::Data { .. } => Self::new(io::ErrorKind::InvalidData, error),
            CodecError::Init { .. } => Self::new(io::ErrorKind::InvalidInput, error),
            CodecError::Memory { .. } => Self::new(io::ErrorKind::OutOfMemory, error),
            CodecError::State { .. } => Self::other(error),
        }
    }
}
