// LZO1X stream decoding.
//
// # Modules
//
// - `length`:  Length extension (zero-run + terminator) for long lengths
// - `opcode`:  Opcode classification and single-instruction decoding
// - `decoder`: Stream framing, instruction execution and overlap copies

pub mod decoder;
pub mod length;
pub mod opcode;

// Re-export key types for convenience.
pub use decoder::{DecodeError, DecodeOptions, Decoder, Step, decode, decode_with};
pub use length::LengthError;
pub use opcode::{END_MARKER_DISTANCE, Instruction, LiteralState, Op, Shape};
