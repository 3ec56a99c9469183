// LZO1X opcode classification and single-instruction decoding.
//
// Opcode layout (top bits select the shape; the 0000 family is split by the
// literal state left by the previous instruction):
//
//   0x00..=0x0F  0000 LLLL  literal run            state Trailing(0)
//   0x00..=0x0F  0000 DDSS  M1 near, 2 bytes <=1kB  state Trailing(1..=3)
//   0x00..=0x0F  0000 DDSS  M1 far, 3 bytes 2..3kB  state AfterRun
//   0x10..=0x1F  0001 HLLL  M4, 16..48kB, end marker
//   0x20..=0x3F  001L LLLL  M3, <=16kB
//   0x40..=0x7F  01LD DDSS  M2 short, 3..4 bytes <=2kB
//   0x80..=0xFF  1LLD DDSS  M2 long, 5..8 bytes <=2kB
//
// `decode_instruction` is a pure function of (input, offset, state); the
// decoder in `decoder.rs` executes the result.

use std::fmt;

use super::decoder::DecodeError;
use super::length::{self, LITERAL_RUN_BASE, LengthError, M3_BASE, M4_BASE};

/// Distance carried by the M4 end-of-stream marker.
pub const END_MARKER_DISTANCE: usize = 16384;

/// Extra distance added by M1 copies that follow a literal run.
const M1_FAR_OFFSET: usize = 2049;

// ---------------------------------------------------------------------------
// Literal state
// ---------------------------------------------------------------------------

/// Literal state threaded between instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralState {
    /// Copy this many (0..=3) literal bytes after the instruction.
    Trailing(u8),
    /// The previous instruction was a literal run; no trailing copy.
    AfterRun,
}

impl LiteralState {
    /// State at the start of a stream.
    pub const START: Self = Self::Trailing(0);

    /// State encoded in the two low bits of an opcode or distance byte.
    #[inline]
    pub fn from_low_bits(byte: u8) -> Self {
        Self::Trailing(byte & 0x3)
    }

    /// Number of literal bytes the main loop copies for this state.
    #[inline]
    pub fn trailing_len(self) -> usize {
        match self {
            Self::Trailing(n) => usize::from(n),
            Self::AfterRun => 0,
        }
    }
}

impl Default for LiteralState {
    fn default() -> Self {
        Self::START
    }
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// Instruction shape selected by an opcode and the current literal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// `0000 LLLL`: copy `3 + L` literal bytes.
    LiteralRun,
    /// `0000 DDSS` after 1..=3 trailing literals: 2-byte copy within 1kB.
    M1Near,
    /// `0000 DDSS` after a literal run: 3-byte copy within 2..3kB.
    M1Far,
    /// `0001 HLLL`: copy within 16..48kB, or end of stream.
    M4,
    /// `001L LLLL`: copy within 16kB.
    M3,
    /// `01LD DDSS`: 3..4 byte copy within 2kB.
    M2Short,
    /// `1LLD DDSS`: 5..8 byte copy within 2kB.
    M2Long,
}

impl Shape {
    /// Classify `opcode` given the literal state left by the previous
    /// instruction.
    pub fn classify(opcode: u8, state: LiteralState) -> Self {
        match opcode {
            0x00..=0x0F => match state {
                LiteralState::Trailing(0) => Self::LiteralRun,
                LiteralState::Trailing(_) => Self::M1Near,
                LiteralState::AfterRun => Self::M1Far,
            },
            0x10..=0x1F => Self::M4,
            0x20..=0x3F => Self::M3,
            0x40..=0x7F => Self::M2Short,
            0x80..=0xFF => Self::M2Long,
        }
    }

    /// Short mnemonic used in traces.
    pub fn name(self) -> &'static str {
        match self {
            Self::LiteralRun => "LIT",
            Self::M1Near => "M1",
            Self::M1Far => "M1F",
            Self::M4 => "M4",
            Self::M3 => "M3",
            Self::M2Short => "M2",
            Self::M2Long => "M2L",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// What an instruction asks the decoder to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Copy `len` bytes verbatim from the input, directly after the
    /// instruction's own bytes.
    Literal { len: usize },
    /// Copy `len` bytes starting `distance` bytes back in the output.
    Copy { distance: usize, len: usize },
    /// End of stream.  Carries the copy length of its M4 encoding; the
    /// copy runs only when 16384 bytes of output exist.  Decoding stops
    /// after the trailing literal copy.
    End { len: usize },
}

/// One decoded instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Absolute input offset of the opcode byte.
    pub offset: usize,
    pub opcode: u8,
    pub shape: Shape,
    pub op: Op,
    /// Literal state handed to the next instruction.
    pub next: LiteralState,
    /// Input bytes taken by the opcode, length extension and distance
    /// bytes.  Literal payloads are not included.
    pub encoded_len: usize,
}

impl Instruction {
    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self.op, Op::End { .. })
    }
}

/// Decode the instruction whose opcode sits at `input[offset]`.
pub fn decode_instruction(
    input: &[u8],
    offset: usize,
    state: LiteralState,
) -> Result<Instruction, DecodeError> {
    let opcode = *input
        .get(offset)
        .ok_or_else(|| DecodeError::truncated(offset, 1))?;
    let shape = Shape::classify(opcode, state);
    let mut pos = offset + 1;

    let (op, next) = match shape {
        Shape::LiteralRun => {
            let len = 3 + extended(input, &mut pos, opcode & 0x0F, LITERAL_RUN_BASE)?;
            (Op::Literal { len }, LiteralState::AfterRun)
        }
        Shape::M1Near | Shape::M1Far => {
            let high = usize::from(read_byte(input, &mut pos)?);
            let low = usize::from((opcode >> 2) & 0x3);
            let (len, distance) = if shape == Shape::M1Near {
                (2, (high << 2) + low + 1)
            } else {
                (3, (high << 2) + low + M1_FAR_OFFSET)
            };
            (Op::Copy { distance, len }, LiteralState::from_low_bits(opcode))
        }
        Shape::M4 => {
            let len = 2 + extended(input, &mut pos, opcode & 0x07, M4_BASE)?;
            let (field, next) = read_distance_pair(input, &mut pos)?;
            let high = usize::from((opcode >> 3) & 0x1) << 14;
            let distance = END_MARKER_DISTANCE + high + field;
            if distance == END_MARKER_DISTANCE {
                (Op::End { len }, next)
            } else {
                (Op::Copy { distance, len }, next)
            }
        }
        Shape::M3 => {
            let len = 2 + extended(input, &mut pos, opcode & 0x1F, M3_BASE)?;
            let (field, next) = read_distance_pair(input, &mut pos)?;
            (Op::Copy { distance: field + 1, len }, next)
        }
        Shape::M2Short | Shape::M2Long => {
            let high = usize::from(read_byte(input, &mut pos)?);
            let low = usize::from((opcode >> 2) & 0x7);
            let len = if shape == Shape::M2Short {
                3 + usize::from((opcode >> 5) & 0x1)
            } else {
                5 + usize::from((opcode >> 5) & 0x3)
            };
            let distance = (high << 3) + low + 1;
            (Op::Copy { distance, len }, LiteralState::from_low_bits(opcode))
        }
    };

    Ok(Instruction {
        offset,
        opcode,
        shape,
        op,
        next,
        encoded_len: pos - offset,
    })
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

#[inline]
fn read_byte(input: &[u8], pos: &mut usize) -> Result<u8, DecodeError> {
    let b = *input
        .get(*pos)
        .ok_or_else(|| DecodeError::truncated(*pos, 1))?;
    *pos += 1;
    Ok(b)
}

/// Read the little-endian distance pair shared by M3 and M4:
/// `DDDDDDSS DDDDDDDD` -> (14-bit distance field, next state).
#[inline]
fn read_distance_pair(input: &[u8], pos: &mut usize) -> Result<(usize, LiteralState), DecodeError> {
    let pair = input
        .get(*pos..*pos + 2)
        .ok_or_else(|| DecodeError::truncated(*pos, 2 - input.len().saturating_sub(*pos)))?;
    let raw = u16::from_le_bytes([pair[0], pair[1]]);
    *pos += 2;
    Ok((usize::from(raw >> 2), LiteralState::from_low_bits(pair[0])))
}

#[inline]
fn extended(input: &[u8], pos: &mut usize, field: u8, base: usize) -> Result<usize, DecodeError> {
    let rest = input.get(*pos..).unwrap_or(&[]);
    let (value, consumed) =
        length::read_extended(rest, usize::from(field), base).map_err(|e| match e {
            LengthError::Underflow => DecodeError::truncated(*pos + rest.len(), 1),
            LengthError::Overflow => DecodeError::LengthOverflow { offset: *pos },
        })?;
    *pos += consumed;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
