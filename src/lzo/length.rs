// LZO length extension.
//
// Short lengths live in spare opcode bits.  A zero field means the length
// continues in the stream: a run of zero bytes (255 each) closed by a
// non-zero terminator byte that is added as-is.

use thiserror::Error;

/// Base added to an extended literal-run length (4-bit field).
pub const LITERAL_RUN_BASE: usize = 15;

/// Base added to an extended M3 match length (5-bit field).
pub const M3_BASE: usize = 31;

/// Base added to an extended M4 match length (3-bit field).
pub const M4_BASE: usize = 7;

/// Largest zero run that cannot overflow `base + 255 * run + 255`.
///
/// The base is at most 31, so two spare steps are enough headroom.
const MAX_ZERO_RUN: usize = usize::MAX / 255 - 2;

// ---------------------------------------------------------------------------
// Decoding from byte slices
// ---------------------------------------------------------------------------

/// Resolve an opcode length `field` against the bytes that follow it.
///
/// Returns `(value, bytes_consumed)`.  A non-zero field is returned as-is and
/// consumes nothing; a zero field consumes `zero_run + 1` bytes of `data` and
/// yields `base + 255 * zero_run + terminator`.
pub fn read_extended(data: &[u8], field: usize, base: usize) -> Result<(usize, usize), LengthError> {
    if field != 0 {
        return Ok((field, 0));
    }

    let zero_run = data.iter().take_while(|&&b| b == 0).count();
    if zero_run > MAX_ZERO_RUN {
        return Err(LengthError::Overflow);
    }
    let terminator = *data.get(zero_run).ok_or(LengthError::Underflow)?;
    let value = base + zero_run * 255 + usize::from(terminator);
    Ok((value, zero_run + 1))
}

/// Number of stream bytes an extended `value` occupies after the opcode.
///
/// Returns 0 when `value` fits in a field of `field_max`.
#[inline]
pub fn extension_len(value: usize, field_max: usize, base: usize) -> usize {
    if value != 0 && value <= field_max {
        return 0;
    }
    let rest = value.saturating_sub(base);
    // The terminator must be non-zero, so an exact multiple of 255 keeps
    // one full 255 in the terminator.
    rest.saturating_sub(1) / 255 + 1
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LengthError {
    /// The zero run was not closed by a terminator byte.
    #[error("length extension underflow (truncated input)")]
    Underflow,
    /// The zero run is too long to represent.
    #[error("length extension overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
