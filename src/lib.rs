//! Oxilzo: decoder for LZO1X-family compressed streams.
//!
//! The crate provides:
//! - The LZO1X decode engine (`lzo`)
//! - Hex/text display helpers (`hexdump`)
//! - File-oriented helpers (`io`)
//! - Parallel batch decoding (`parallel` feature)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! // Length byte, a 4-byte literal run, then the end marker.
//! let stream = [0x09, 0x01, b'l', b'z', b'o', b'!', 0x11, 0x00, 0x00];
//! let decoded = oxilzo::decode(&stream).unwrap();
//! assert_eq!(decoded, b"lzo!");
//! ```

pub mod hexdump;
pub mod io;
pub mod lzo;

#[cfg(feature = "parallel")]
pub mod batch;

#[cfg(feature = "cli")]
pub mod cli;

pub use lzo::{DecodeError, DecodeOptions, Decoder, decode, decode_with};
