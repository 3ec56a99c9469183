// LZO1X stream decoder.
//
// Framing: the first byte declares the stream length, i.e. the absolute
// input offset up to which instructions are started.  Instructions begin at
// offset 1.  Each instruction is decoded by `opcode::decode_instruction`,
// executed against the output buffer, and followed by the trailing literal
// copy its literal state asks for.  Decoding stops at the declared length or
// at the M4 end marker, whichever comes first.  The end marker is an M4 copy
// at distance 16384: it copies only once that much output exists.

use thiserror::Error;

use super::opcode::{self, END_MARKER_DISTANCE, Instruction, LiteralState, Op, Shape};

/// Output reservation used when no hint is configured.
const DEFAULT_CAPACITY_HINT: usize = 256;

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

/// Malformed compressed stream.
///
/// Every variant is fatal for the current decode; no partial output is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input has no length byte.
    #[error("malformed stream: empty input")]
    Empty,

    /// A read went past the end of the input.
    #[error("malformed stream: truncated at offset {offset} ({needed} more bytes needed)")]
    Truncated { offset: usize, needed: usize },

    /// A back-reference points before the start of the output.
    #[error(
        "malformed stream: distance {distance} at offset {offset} exceeds {available} bytes of output"
    )]
    InvalidDistance {
        offset: usize,
        distance: usize,
        available: usize,
    },

    /// The stream does not start with a literal run.
    #[error("malformed stream: opcode {opcode:#04x} at offset {offset} cannot start a stream")]
    UnexpectedOpcode { offset: usize, opcode: u8 },

    /// A length extension is too long to represent.
    #[error("malformed stream: length extension overflow at offset {offset}")]
    LengthOverflow { offset: usize },

    /// The output would grow past `DecodeOptions::max_output_len`.
    #[error("malformed stream: output exceeds limit of {limit} bytes at offset {offset}")]
    OutputLimit { offset: usize, limit: usize },

    /// The declared length was reached without an end marker.
    #[error("malformed stream: no end-of-stream marker before offset {offset}")]
    MissingEndMarker { offset: usize },
}

impl DecodeError {
    /// Create a truncated-input error.
    pub fn truncated(offset: usize, needed: usize) -> Self {
        Self::Truncated { offset, needed }
    }

    /// Create an invalid-distance error.
    pub fn invalid_distance(offset: usize, distance: usize, available: usize) -> Self {
        Self::InvalidDistance {
            offset,
            distance,
            available,
        }
    }

    /// Input offset the error was detected at, if any.
    pub fn offset(&self) -> Option<usize> {
        match *self {
            Self::Empty => None,
            Self::Truncated { offset, .. }
            | Self::InvalidDistance { offset, .. }
            | Self::UnexpectedOpcode { offset, .. }
            | Self::LengthOverflow { offset }
            | Self::OutputLimit { offset, .. }
            | Self::MissingEndMarker { offset } => Some(offset),
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Refuse to grow the output beyond this many bytes.
    pub max_output_len: Option<usize>,
    /// Fail if the declared length is reached without an end marker.
    pub require_end_marker: bool,
    /// Initial output reservation.
    pub capacity_hint: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_output_len: None,
            require_end_marker: false,
            capacity_hint: DEFAULT_CAPACITY_HINT,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Record of one executed instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub instruction: Instruction,
    /// Literal bytes copied after the instruction.
    pub trailing_literals: usize,
    /// Output length after the step.
    pub output_len: usize,
}

/// Step-by-step LZO1X decoder over an in-memory stream.
///
/// Also an iterator over [`Step`]s; iteration ends after the last
/// instruction or the first error.
pub struct Decoder<'a> {
    input: &'a [u8],
    declared_len: usize,
    pos: usize,
    output: Vec<u8>,
    state: LiteralState,
    options: DecodeOptions,
    instructions: u64,
    end_marker: bool,
    done: bool,
    error: Option<DecodeError>,
}

impl<'a> Decoder<'a> {
    /// Create a decoder with default options.
    pub fn new(input: &'a [u8]) -> Result<Self, DecodeError> {
        Self::with_options(input, DecodeOptions::default())
    }

    /// Create a decoder, consuming the leading length byte.
    pub fn with_options(input: &'a [u8], options: DecodeOptions) -> Result<Self, DecodeError> {
        let declared_len = usize::from(*input.first().ok_or(DecodeError::Empty)?);
        let capacity = match options.max_output_len {
            Some(limit) => options.capacity_hint.min(limit),
            None => options.capacity_hint,
        };
        log::debug!(
            "lzo: decoding {} input bytes, declared length {declared_len}",
            input.len()
        );
        Ok(Self {
            input,
            declared_len,
            pos: 1,
            output: Vec::with_capacity(capacity),
            state: LiteralState::START,
            options,
            instructions: 0,
            end_marker: false,
            done: false,
            error: None,
        })
    }

    /// Declared stream length from the leading byte.
    pub fn declared_len(&self) -> usize {
        self.declared_len
    }

    /// Current input offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Literal state the next instruction will be classified with.
    pub fn state(&self) -> LiteralState {
        self.state
    }

    /// Output produced so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Number of instructions executed.
    pub fn instructions_decoded(&self) -> u64 {
        self.instructions
    }

    /// Whether decoding stopped at an end marker.
    pub fn saw_end_marker(&self) -> bool {
        self.end_marker
    }

    /// Whether there is nothing left to decode.
    pub fn is_finished(&self) -> bool {
        self.done || self.pos >= self.declared_len
    }

    /// Execute the next instruction and its trailing literal copy.
    ///
    /// Returns `Ok(None)` once the stream is finished.
    pub fn step(&mut self) -> Result<Option<Step>, DecodeError> {
        if self.is_finished() {
            if !self.done {
                self.done = true;
                if self.options.require_end_marker && !self.end_marker {
                    return Err(self.fail(DecodeError::MissingEndMarker { offset: self.pos }));
                }
            }
            return Ok(None);
        }

        match self.execute_next() {
            Ok(step) => Ok(Some(step)),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Run to completion and return the output.
    pub fn finish(mut self) -> Result<Vec<u8>, DecodeError> {
        while self.step()?.is_some() {}
        log::debug!(
            "lzo: decoded {} bytes in {} instructions (end marker: {})",
            self.output.len(),
            self.instructions,
            self.end_marker
        );
        Ok(self.output)
    }

    /// Consume the decoder, returning its output.
    ///
    /// Fails with the error that stopped decoding, so a malformed stream
    /// never yields partial output.  A decoder that has not finished
    /// returns what it has produced so far.
    pub fn into_output(self) -> Result<Vec<u8>, DecodeError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.output),
        }
    }

    fn fail(&mut self, err: DecodeError) -> DecodeError {
        self.done = true;
        self.error = Some(err.clone());
        err
    }

    fn execute_next(&mut self) -> Result<Step, DecodeError> {
        let ins = opcode::decode_instruction(self.input, self.pos, self.state)?;
        if self.instructions == 0 && ins.shape != Shape::LiteralRun {
            return Err(DecodeError::UnexpectedOpcode {
                offset: ins.offset,
                opcode: ins.opcode,
            });
        }
        self.pos += ins.encoded_len;

        match ins.op {
            Op::Literal { len } => self.copy_literals(len)?,
            Op::Copy { distance, len } => self.copy_match(ins.offset, distance, len)?,
            Op::End { len } => {
                if END_MARKER_DISTANCE <= self.output.len() {
                    self.copy_match(ins.offset, END_MARKER_DISTANCE, len)?;
                }
                self.end_marker = true;
            }
        }

        let trailing = ins.next.trailing_len();
        self.copy_literals(trailing)?;

        self.state = ins.next;
        self.instructions += 1;
        if ins.is_end() {
            self.done = true;
        }

        log::trace!(
            "lzo: {:>6} {:<3} {:?} next={:?} out={}",
            ins.offset,
            ins.shape,
            ins.op,
            ins.next,
            self.output.len()
        );

        Ok(Step {
            instruction: ins,
            trailing_literals: trailing,
            output_len: self.output.len(),
        })
    }

    /// Append `len` input bytes at the cursor to the output.
    fn copy_literals(&mut self, len: usize) -> Result<(), DecodeError> {
        if len == 0 {
            return Ok(());
        }
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| DecodeError::truncated(self.pos, len))?;
        let bytes = self.input.get(self.pos..end).ok_or_else(|| {
            DecodeError::truncated(self.input.len(), end - self.input.len().max(self.pos))
        })?;
        self.reserve_output(self.pos, len)?;
        self.output.extend_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Append `len` bytes copied from `distance` bytes back in the output.
    fn copy_match(&mut self, offset: usize, distance: usize, len: usize) -> Result<(), DecodeError> {
        let available = self.output.len();
        if distance == 0 || distance > available {
            return Err(DecodeError::invalid_distance(offset, distance, available));
        }
        self.reserve_output(offset, len)?;
        copy_within_output(&mut self.output, distance, len);
        Ok(())
    }

    fn reserve_output(&mut self, offset: usize, extra: usize) -> Result<(), DecodeError> {
        if let Some(limit) = self.options.max_output_len
            && self.output.len().saturating_add(extra) > limit
        {
            return Err(DecodeError::OutputLimit { offset, limit });
        }
        self.output.reserve(extra);
        Ok(())
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Step, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step().transpose()
    }
}

/// Copy `len` bytes starting `distance` bytes before the end of `output`.
///
/// When `len > distance` the copy reads bytes it has just written, repeating
/// the last `distance` bytes.  Caller guarantees `1 <= distance <= output.len()`.
pub(crate) fn copy_within_output(output: &mut Vec<u8>, distance: usize, len: usize) {
    let start = output.len() - distance;
    if len <= distance {
        output.extend_from_within(start..start + len);
        return;
    }
    for i in 0..len {
        let b = output[start + i];
        output.push(b);
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Decode a complete compressed stream (including its length byte).
pub fn decode(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    decode_with(input, DecodeOptions::default())
}

/// Decode a complete compressed stream with explicit options.
pub fn decode_with(input: &[u8], options: DecodeOptions) -> Result<Vec<u8>, DecodeError> {
    Decoder::with_options(input, options)?.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
