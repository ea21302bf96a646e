//! The step-function interface every codec adapter implements.
//!
//! A [`StreamCodec`] is driven by the transformer one step at a time: each
//! call offers the unconsumed part of the input buffer and the whole output
//! buffer, and reports how many bytes were consumed and produced. Error
//! statuses (corrupt data, allocation failure, state violations) travel as
//! [`CodecError`] values; the remaining statuses are described by
//! [`StepStatus`].

use crate::error::CodecError;

/// Whether a session compresses or decompresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Compress plain bytes into a stream.
    Encode,
    /// Decompress a stream into plain bytes.
    Decode,
}

impl Direction {
    /// Lowercase name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Decode => "decode",
        }
    }
}

/// Signals whether more input will follow the bytes offered to a step.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FlushMode {
    /// More input follows; the encoder may hold back buffered output.
    #[default]
    Normal,
    /// The source is exhausted; emit everything and finalise the stream.
    Finish,
}

/// Non-error outcome of a codec step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StepStatus {
    /// Progress was made (or none was possible); call again with more input or space.
    Ok,
    /// The stream is complete and every pending byte has been produced.
    StreamEnd,
    /// The decoder needs a preset dictionary to continue.
    NeedDictionary,
}

/// Result of one [`StreamCodec::step`] call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Step {
    /// Bytes consumed from the front of the input slice.
    pub consumed: usize,
    /// Bytes written to the front of the output slice.
    pub produced: usize,
    /// Outcome of the step.
    pub status: StepStatus,
}

impl Step {
    /// Creates a step result.
    #[must_use]
    pub const fn new(consumed: usize, produced: usize, status: StepStatus) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }

    /// Returns `true` when the step neither consumed nor produced anything.
    #[must_use]
    pub const fn is_stalled(&self) -> bool {
        self.consumed == 0 && self.produced == 0
    }
}

/// A stateful encoder or decoder that can be advanced incrementally.
///
/// Implementations own their codec library state; dropping the value frees
/// it. Wrap a codec in a [`Session`](crate::Session) to get idempotent,
/// unwind-safe release.
pub trait StreamCodec {
    /// Short codec name used in errors and log events.
    fn name(&self) -> &'static str;

    /// Direction this codec was created for.
    fn direction(&self) -> Direction;

    /// Advances the codec over `input`, writing into `output`.
    ///
    /// `flush` is only meaningful for encoders; decoders ignore it.
    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<Step, CodecError>;

    /// Estimated bytes of internal working memory held by the codec library.
    fn session_memory(&self) -> usize;
}

impl<C> StreamCodec for Box<C>
where
    C: StreamCodec + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn direction(&self) -> Direction {
        (**self).direction()
    }

    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<Step, CodecError> {
        (**self).step(input, output, flush)
    }

    fn session_memory(&self) -> usize {
        (**self).session_memory()
    }
}
