//! Streaming Zstandard sessions shared across the workspace.
//!
//! The interface mirrors the DEFLATE sessions so the transformer can swap
//! algorithms without reworking its loop. Both sessions own a zstd context
//! ([`zstd_safe::CCtx`] / [`zstd_safe::DCtx`]) and step it over
//! caller-provided slices, so no frame is ever buffered whole.
//!
//! The encoder pins the hash and chain tables to
//! [`ZstdParams::effective_table_log`]; without that cap the higher levels
//! size their tables for unbounded input and dwarf the window. The decoder
//! accepts any window up to `window_log_max`, which defaults to zstd's own
//! limit.

use tracing::debug;
use zstd::zstd_safe::zstd_sys::{ZSTD_EndDirective, ZSTD_ErrorCode};
use zstd::zstd_safe::{self, CCtx, CParameter, DCtx, DParameter, ErrorCode, InBuffer, OutBuffer};

use crate::codec::{Direction, FlushMode, Step, StepStatus, StreamCodec};
use crate::config::{
    CompressionLevel, MAX_ZSTD_TABLE_LOG, MAX_ZSTD_WINDOW_LOG, MIN_ZSTD_TABLE_LOG,
    MIN_ZSTD_WINDOW_LOG, ZstdParams,
};
use crate::error::CodecError;

const CODEC: &str = "zstd";

fn validate_log(what: &str, value: u32, min: u32, max: u32) -> Result<(), CodecError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CodecError::init(
            CODEC,
            format!("{what} {value} outside {min}..={max}"),
        ))
    }
}

/// zstd reports failures as `(size_t)-code`.
fn is_allocation_failure(code: ErrorCode) -> bool {
    code.wrapping_neg() == ZSTD_ErrorCode::ZSTD_error_memory_allocation as usize
}

fn init_error(code: ErrorCode) -> CodecError {
    if is_allocation_failure(code) {
        CodecError::Memory { codec: CODEC }
    } else {
        CodecError::init(CODEC, zstd_safe::get_error_name(code))
    }
}

fn encode_error(code: ErrorCode) -> CodecError {
    if is_allocation_failure(code) {
        CodecError::Memory { codec: CODEC }
    } else {
        CodecError::state(CODEC, zstd_safe::get_error_name(code))
    }
}

fn decode_error(code: ErrorCode) -> CodecError {
    if is_allocation_failure(code) {
        CodecError::Memory { codec: CODEC }
    } else {
        CodecError::data(CODEC, zstd_safe::get_error_name(code))
    }
}

/// Incremental Zstandard compressor producing a single frame.
pub struct ZstdEncoder {
    ctx: CCtx<'static>,
    memory: usize,
}

impl ZstdEncoder {
    /// Creates an encoder; invalid parameters fail with [`CodecError::Init`].
    pub fn new(level: CompressionLevel, params: &ZstdParams) -> Result<Self, CodecError> {
        validate_log("window log", params.window_log, MIN_ZSTD_WINDOW_LOG, MAX_ZSTD_WINDOW_LOG)?;
        validate_log("table log", params.table_log, MIN_ZSTD_TABLE_LOG, MAX_ZSTD_TABLE_LOG)?;

        let mut ctx = CCtx::try_create().ok_or(CodecError::Memory { codec: CODEC })?;
        let table_log = params.effective_table_log();
        for parameter in [
            CParameter::CompressionLevel(level.zstd_level()),
            CParameter::WindowLog(params.window_log),
            CParameter::HashLog(table_log),
            CParameter::ChainLog(table_log),
            CParameter::EnableLongDistanceMatching(false),
            CParameter::ChecksumFlag(params.checksum),
        ] {
            ctx.set_parameter(parameter).map_err(init_error)?;
        }

        debug!(
            target: "streampress::codec",
            codec = CODEC,
            level = level.zstd_level(),
            window_log = params.window_log,
            table_log,
            checksum = params.checksum,
            "zstd encoder initialised"
        );
        Ok(Self {
            ctx,
            memory: params.encoder_memory(),
        })
    }
}

impl StreamCodec for ZstdEncoder {
    fn name(&self) -> &'static str {
        CODEC
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
        let directive = match flush {
            FlushMode::Normal => ZSTD_EndDirective::ZSTD_e_continue,
            FlushMode::Finish => ZSTD_EndDirective::ZSTD_e_end,
        };
        let mut source = InBuffer::around(input);
        let mut sink = OutBuffer::around(output);
        let remaining = self
            .ctx
            .compress_stream2(&mut sink, &mut source, directive)
            .map_err(encode_error)?;

        // Under `e_end` a zero return means every input byte is in the frame
        // and the epilogue has been flushed.
        let status = if flush == FlushMode::Finish && remaining == 0 {
            StepStatus::StreamEnd
        } else {
            StepStatus::Ok
        };
        Ok(Step::new(source.pos(), sink.pos(), status))
    }

    fn session_memory(&self) -> usize {
        self.memory
    }
}

/// Incremental Zstandard decompressor for a single frame.
pub struct ZstdDecoder {
    ctx: DCtx<'static>,
    memory: usize,
}

impl ZstdDecoder {
    /// Creates a decoder accepting windows up to `params.window_log_max`.
    pub fn new(params: &ZstdParams) -> Result<Self, CodecError> {
        validate_log(
            "window log limit",
            params.window_log_max,
            MIN_ZSTD_WINDOW_LOG,
            MAX_ZSTD_WINDOW_LOG,
        )?;
        let mut ctx = DCtx::try_create().ok_or(CodecError::Memory { codec: CODEC })?;
        ctx.set_parameter(DParameter::WindowLogMax(params.window_log_max))
            .map_err(init_error)?;
        debug!(
            target: "streampress::codec",
            codec = CODEC,
            window_log_max = params.window_log_max,
            "zstd decoder initialised"
        );
        Ok(Self {
            ctx,
            memory: params.decoder_memory(),
        })
    }
}

impl StreamCodec for ZstdDecoder {
    fn name(&self) -> &'static str {
        CODEC
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
        let mut source = InBuffer::around(input);
        let mut sink = OutBuffer::around(output);
        let hint = self
            .ctx
            .decompress_stream(&mut sink, &mut source)
            .map_err(decode_error)?;
        // A zero hint means the frame is complete and fully flushed.
        let status = if hint == 0 {
            StepStatus::StreamEnd
        } else {
            StepStatus::Ok
        };
        Ok(Step::new(source.pos(), sink.pos(), status))
    }

    fn session_memory(&self) -> usize {
        self.memory
    }
}
