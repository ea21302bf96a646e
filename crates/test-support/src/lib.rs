//! Shared test doubles and data generators for the streampress workspace.
//!
//! The readers and writers here fail in controlled ways so tests can drive the
//! transformer down its error paths without touching real devices.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use tempfile::TempDir;

/// A writer that accepts `limit` bytes and then fails every write.
#[derive(Debug)]
pub struct FailingWriter {
    accepted: Vec<u8>,
    limit: usize,
    kind: io::ErrorKind,
}

impl FailingWriter {
    /// Accepts up to `limit` bytes before failing with `kind`.
    pub fn after(limit: usize, kind: io::ErrorKind) -> Self {
        Self {
            accepted: Vec::new(),
            limit,
            kind,
        }
    }

    /// Fails on the very first write.
    pub fn immediately() -> Self {
        Self::after(0, io::ErrorKind::BrokenPipe)
    }

    /// Bytes accepted before the failure.
    pub fn accepted(&self) -> &[u8] {
        &self.accepted
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit - self.accepted.len();
        if room == 0 {
            return Err(io::Error::new(self.kind, "injected write failure"));
        }
        let len = buf.len().min(room);
        self.accepted.extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A writer that reports zero bytes written, which `write_all` turns into `WriteZero`.
#[derive(Debug, Default)]
pub struct ShortWriter;

impl Write for ShortWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A reader that yields a prefix of `data` and then fails.
#[derive(Debug)]
pub struct FailingReader {
    data: Vec<u8>,
    position: usize,
    fail_at: usize,
}

impl FailingReader {
    /// Serves `data[..fail_at]` and fails on the next read after that.
    pub fn new(data: Vec<u8>, fail_at: usize) -> Self {
        let fail_at = fail_at.min(data.len());
        Self {
            data,
            position: 0,
            fail_at,
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position >= self.fail_at {
            return Err(io::Error::other("injected read failure"));
        }
        let len = buf.len().min(self.fail_at - self.position);
        buf[..len].copy_from_slice(&self.data[self.position..self.position + len]);
        self.position += len;
        Ok(len)
    }
}

/// A reader that hands out at most `step` bytes per call.
#[derive(Debug)]
pub struct TrickleReader<'a> {
    data: &'a [u8],
    step: usize,
}

impl<'a> TrickleReader<'a> {
    /// Serves `data` in slices of at most `step` bytes.
    pub fn new(data: &'a [u8], step: usize) -> Self {
        Self {
            data,
            step: step.max(1),
        }
    }
}

impl Read for TrickleReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.step).min(self.data.len());
        buf[..len].copy_from_slice(&self.data[..len]);
        self.data = &self.data[len..];
        Ok(len)
    }
}

/// A repeating, highly compressible ASCII pattern of `len` bytes.
pub fn patterned(len: usize) -> Vec<u8> {
    const PATTERN: &[u8] = b"The quick brown fox jumps over the lazy dog. ";
    PATTERN.iter().copied().cycle().take(len).collect()
}

/// Deterministic pseudo-random bytes (xorshift64*), effectively incompressible.
pub fn pseudo_random(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state >> 12;
            state ^= state << 25;
            state ^= state >> 27;
            (state.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 56) as u8
        })
        .collect()
}

/// A temporary directory holding a file named `name` with `contents`.
///
/// The directory is removed when the returned guard drops.
pub fn scratch_file(name: &str, contents: &[u8]) -> io::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);
    std::fs::write(&path, contents)?;
    Ok((dir, path))
}
