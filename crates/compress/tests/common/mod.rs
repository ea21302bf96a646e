//! Helpers shared by the compress integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use compress::{
    CodecError, CompressionAlgorithm, Direction, FlushMode, Step, StreamCodec, TransformConfig,
};

/// Counts codec sessions opened and released through [`LeakTracker::wrap`].
#[derive(Clone, Debug, Default)]
pub struct LeakTracker {
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl LeakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrap<C: StreamCodec>(&self, codec: C) -> TrackedCodec<C> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        TrackedCodec {
            inner: codec,
            released: Arc::clone(&self.released),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn assert_balanced(&self) {
        assert!(self.opened() > 0, "no session was tracked");
        assert_eq!(
            self.opened(),
            self.released(),
            "every opened session must be released"
        );
    }
}

/// A codec wrapper that reports its release to a [`LeakTracker`].
pub struct TrackedCodec<C> {
    inner: C,
    released: Arc<AtomicUsize>,
}

impl<C> Drop for TrackedCodec<C> {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl<C: StreamCodec> StreamCodec for TrackedCodec<C> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn direction(&self) -> Direction {
        self.inner.direction()
    }

    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<Step, CodecError> {
        self.inner.step(input, output, flush)
    }

    fn session_memory(&self) -> usize {
        self.inner.session_memory()
    }
}

/// Every algorithm compiled into this build.
pub fn algorithms() -> impl Iterator<Item = CompressionAlgorithm> {
    CompressionAlgorithm::available().iter().copied()
}

/// Default configuration for `algorithm` with the given chunk size.
pub fn config(algorithm: CompressionAlgorithm, chunk_size: usize) -> TransformConfig {
    TransformConfig::new(algorithm).with_chunk_size(chunk_size)
}

/// Mixed compressible and incompressible content.
pub fn mixed_payload(len: usize) -> Vec<u8> {
    let mut data = test_support::patterned(len / 2);
    data.extend(test_support::pseudo_random(len - len / 2, 0x5eed));
    data
}
