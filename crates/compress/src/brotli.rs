//! Streaming Brotli sessions over the pure-Rust `brotli` crate.
//!
//! The encoder drives [`BrotliEncoderStateStruct::compress_stream`] over
//! caller-provided slices. A metablock buffers its whole input before it is
//! emitted, so the encoder forces one out after every
//! `BROTLI_METABLOCK_INPUT` bytes; otherwise the higher qualities hold up to
//! twice the window of pending commands. The decoder runs in strict mode,
//! which rejects large-window streams.

use brotli::enc::encode::{
    BrotliEncoderDestroyInstance, BrotliEncoderOperation, BrotliEncoderParameter,
    BrotliEncoderStateStruct,
};
use brotli::enc::StandardAlloc;
use brotli::interface;
use brotli::{BrotliDecompressStream, BrotliResult, BrotliState};
use tracing::debug;

use crate::codec::{Direction, FlushMode, Step, StepStatus, StreamCodec};
use crate::config::{
    BROTLI_METABLOCK_INPUT, BrotliParams, CompressionLevel, MAX_BROTLI_LGWIN, MAX_BROTLI_QUALITY,
    MIN_BROTLI_LGWIN,
};
use crate::error::CodecError;

const CODEC: &str = "brotli";

/// Incremental Brotli compressor.
pub struct BrotliEncoder {
    state: BrotliEncoderStateStruct<StandardAlloc>,
    /// Input bytes handed to the encoder since the last forced flush.
    pending: usize,
    /// A forced flush has started and still has output to drain.
    flushing: bool,
    memory: usize,
}

impl BrotliEncoder {
    /// Creates an encoder; a quality above 9 or a window outside `10..=24`
    /// fails with [`CodecError::Init`].
    pub fn new(level: CompressionLevel, params: &BrotliParams) -> Result<Self, CodecError> {
        let quality = params.quality(level);
        if quality > MAX_BROTLI_QUALITY {
            return Err(CodecError::init(
                CODEC,
                format!("quality {quality} outside 0..={MAX_BROTLI_QUALITY}"),
            ));
        }
        if !(MIN_BROTLI_LGWIN..=MAX_BROTLI_LGWIN).contains(&params.lgwin) {
            return Err(CodecError::init(
                CODEC,
                format!(
                    "window log {} outside {MIN_BROTLI_LGWIN}..={MAX_BROTLI_LGWIN}",
                    params.lgwin
                ),
            ));
        }

        let mut state = BrotliEncoderStateStruct::new(StandardAlloc::default());
        if !state.set_parameter(BrotliEncoderParameter::BROTLI_PARAM_QUALITY, quality)
            || !state.set_parameter(BrotliEncoderParameter::BROTLI_PARAM_LGWIN, params.lgwin)
        {
            return Err(CodecError::init(CODEC, "encoder refused its parameters"));
        }

        debug!(
            target: "streampress::codec",
            codec = CODEC,
            quality,
            lgwin = params.lgwin,
            "brotli encoder initialised"
        );
        Ok(Self {
            state,
            pending: 0,
            flushing: false,
            memory: params.encoder_memory(quality),
        })
    }

    /// Runs one `compress_stream` call, returning `(consumed, produced)`.
    fn run(
        &mut self,
        op: BrotliEncoderOperation,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize), CodecError> {
        let mut ignore_metablock =
            |_data: &mut interface::PredictionModeContextMap<interface::InputReferenceMut>,
             _cmds: &mut [interface::StaticCommand],
             _mb: interface::InputPair,
             _alloc: &mut StandardAlloc| ();
        let mut available_in = input.len();
        let mut in_offset = 0;
        let mut available_out = output.len();
        let mut out_offset = 0;
        let mut total_out = None;
        if self.state.compress_stream(
            op,
            &mut available_in,
            input,
            &mut in_offset,
            &mut available_out,
            output,
            &mut out_offset,
            &mut total_out,
            &mut ignore_metablock,
        ) {
            Ok((in_offset, out_offset))
        } else {
            Err(CodecError::state(CODEC, "encoder rejected the operation"))
        }
    }
}

impl StreamCodec for BrotliEncoder {
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
        let mut consumed = 0;
        let mut produced = 0;
        loop {
            let remaining = input.len() - consumed;
            let room = BROTLI_METABLOCK_INPUT - self.pending;
            let (op, offered) = if self.flushing {
                (BrotliEncoderOperation::BROTLI_OPERATION_FLUSH, 0)
            } else if flush == FlushMode::Finish && remaining <= room {
                (BrotliEncoderOperation::BROTLI_OPERATION_FINISH, remaining)
            } else {
                (BrotliEncoderOperation::BROTLI_OPERATION_PROCESS, remaining.min(room))
            };

            let (taken, written) = self.run(
                op,
                &input[consumed..consumed + offered],
                &mut output[produced..],
            )?;
            consumed += taken;
            produced += written;
            self.pending += taken;

            let mut progressed = taken > 0 || written > 0;
            match op {
                BrotliEncoderOperation::BROTLI_OPERATION_FINISH if self.state.is_finished() => {
                    return Ok(Step::new(consumed, produced, StepStatus::StreamEnd));
                }
                BrotliEncoderOperation::BROTLI_OPERATION_FLUSH if !self.state.has_more_output() => {
                    self.flushing = false;
                    self.pending = 0;
                    progressed = true;
                }
                _ => {}
            }
            if op == BrotliEncoderOperation::BROTLI_OPERATION_PROCESS
                && self.pending >= BROTLI_METABLOCK_INPUT
            {
                self.flushing = true;
            }

            let drained = consumed == input.len()
                && !self.flushing
                && op == BrotliEncoderOperation::BROTLI_OPERATION_PROCESS;
            if produced == output.len() || !progressed || drained {
                return Ok(Step::new(consumed, produced, StepStatus::Ok));
            }
        }
    }

    fn session_memory(&self) -> usize {
        self.memory
    }
}

impl Drop for BrotliEncoder {
    fn drop(&mut self) {
        BrotliEncoderDestroyInstance(&mut self.state);
    }
}

/// Incremental Brotli decompressor for a single stream.
pub struct BrotliDecoder {
    state: BrotliState<StandardAlloc, StandardAlloc, StandardAlloc>,
    memory: usize,
}

impl BrotliDecoder {
    /// Creates a decoder accepting any standard window.
    pub fn new(params: &BrotliParams) -> Result<Self, CodecError> {
        let state = BrotliState::new_strict(
            StandardAlloc::default(),
            StandardAlloc::default(),
            StandardAlloc::default(),
        );
        debug!(target: "streampress::codec", codec = CODEC, "brotli decoder initialised");
        Ok(Self {
            state,
            memory: params.decoder_memory(),
        })
    }
}

impl StreamCodec for BrotliDecoder {
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
        let mut available_in = input.len();
        let mut in_offset = 0;
        let mut available_out = output.len();
        let mut out_offset = 0;
        let mut total_out = 0;
        let result = BrotliDecompressStream(
            &mut available_in,
            &mut in_offset,
            input,
            &mut available_out,
            &mut out_offset,
            output,
            &mut total_out,
            &mut self.state,
        );
        let status = match result {
            BrotliResult::ResultSuccess => StepStatus::StreamEnd,
            BrotliResult::NeedsMoreInput | BrotliResult::NeedsMoreOutput => StepStatus::Ok,
            BrotliResult::ResultFailure => {
                return Err(CodecError::data(
                    CODEC,
                    format!("decoder error {:?}", self.state.error_code),
                ));
            }
        };
        Ok(Step::new(in_offset, out_offset, status))
    }

    fn session_memory(&self) -> usize {
        self.memory
    }
}
