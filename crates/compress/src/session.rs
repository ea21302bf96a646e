//! Scoped ownership of a codec instance.

use tracing::trace;

use crate::codec::{Direction, FlushMode, Step, StreamCodec};
use crate::error::CodecError;

/// Exclusive owner of one codec for the lifetime of a transform.
///
/// [`release`](Self::release) frees the codec's library state and may be
/// called any number of times. Dropping the session releases it too, which
/// covers early returns and unwinding.
pub struct Session<C: StreamCodec> {
    codec: Option<C>,
    name: &'static str,
    direction: Direction,
}

impl<C: StreamCodec> Session<C> {
    /// Takes ownership of `codec`.
    pub fn new(codec: C) -> Self {
        let name = codec.name();
        let direction = codec.direction();
        trace!(
            target: "streampress::session",
            codec = name,
            direction = direction.as_str(),
            memory = codec.session_memory(),
            "session opened"
        );
        Self {
            codec: Some(codec),
            name,
            direction,
        }
    }

    /// Codec name, still available after release.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Direction of the wrapped codec.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns `true` once the codec has been released.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.codec.is_none()
    }

    /// Working memory of the live codec; zero after release.
    #[must_use]
    pub fn session_memory(&self) -> usize {
        self.codec.as_ref().map_or(0, StreamCodec::session_memory)
    }

    /// Steps the codec. Fails with [`CodecError::State`] after release.
    pub fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<Step, CodecError> {
        match self.codec.as_mut() {
            Some(codec) => codec.step(input, output, flush),
            None => Err(CodecError::state(self.name, "session already released")),
        }
    }

    /// Frees the codec. Subsequent calls do nothing.
    pub fn release(&mut self) {
        if let Some(codec) = self.codec.take() {
            drop(codec);
            trace!(
                target: "streampress::session",
                codec = self.name,
                direction = self.direction.as_str(),
                "session released"
            );
        }
    }
}

impl<C: StreamCodec> Drop for Session<C> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<C: StreamCodec> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("codec", &self.name)
            .field("direction", &self.direction)
            .field("released", &self.is_released())
            .finish()
    }
}
