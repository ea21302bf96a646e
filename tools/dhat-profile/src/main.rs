//! Heap profile of a chunked transform.
//!
//! Streams a generated input through an encoder and then a decoder without
//! ever holding the whole payload, and reports the peak heap against the
//! configured memory estimate. The DEFLATE backends and brotli allocate
//! through the Rust global allocator, so their figures are measured. zstd
//! allocates inside its C library, which dhat cannot see.
//!
//! Usage: `cargo run --release -- [ALGO] [MIB]`

use std::env;
use std::io::{self, Read};

use compress::{CompressionAlgorithm, Direction, TransformConfig, transform_decode, transform_encode};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

/// Produces `remaining` bytes of mildly compressible text.
struct Generated {
    remaining: u64,
    counter: u64,
}

impl Read for Generated {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        for byte in &mut buf[..len] {
            self.counter = self.counter.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            *byte = b'a' + ((self.counter >> 60) as u8);
        }
        self.remaining -= len as u64;
        Ok(len)
    }
}

/// Whether dhat sees the codec's own allocations.
fn heap_visibility(algorithm: CompressionAlgorithm) -> &'static str {
    match algorithm {
        CompressionAlgorithm::Zstd => "unverified: zstd allocates outside the Rust heap",
        _ => "measured",
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let algorithm: CompressionAlgorithm = args.next().as_deref().unwrap_or("gzip").parse()?;
    let mebibytes: u64 = args.next().as_deref().unwrap_or("64").parse()?;
    let config = TransformConfig::new(algorithm);

    let measured = heap_visibility(algorithm);

    let _profiler = dhat::Profiler::new_heap();

    let mut compressed = Vec::new();
    let mut source = Generated {
        remaining: mebibytes << 20,
        counter: 1,
    };
    let encoded = transform_encode(&config, &mut source, &mut compressed)?;
    let encode_peak = dhat::HeapStats::get().max_bytes;

    let decoded = transform_decode(&config, &mut compressed.as_slice(), &mut io::sink())?;
    let stats = dhat::HeapStats::get();

    println!("algorithm: {algorithm}");
    println!(
        "encode: {} -> {} bytes, {} chunks",
        encoded.bytes_read, encoded.bytes_written, encoded.chunks
    );
    println!(
        "decode: {} -> {} bytes, {} chunks",
        decoded.bytes_read, decoded.bytes_written, decoded.chunks
    );
    println!(
        "peak heap during encode: {encode_peak} bytes (includes the compressed output buffer; estimate {}, {measured})",
        config.peak_memory(Direction::Encode)
    );
    println!(
        "peak heap overall: {} bytes, decoder estimate {} ({measured})",
        stats.max_bytes,
        config.peak_memory(Direction::Decode)
    );
    Ok(())
}
