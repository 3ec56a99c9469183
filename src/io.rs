// File-level I/O helpers for stream decoding.
//
// Provides `decode_file()` and `decode_reader()` convenience functions that
// wrap the in-memory decoder with buffered I/O.  Optionally computes a
// SHA-256 checksum of the decoded output (feature-gated behind `file-io`).

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "file-io")]
use sha2::Digest;
use thiserror::Error;

use crate::lzo::decoder::{DecodeError, DecodeOptions, Decoder};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `decode_file()` and `decode_reader()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    /// Compressed input size in bytes (length byte included).
    pub input_size: u64,
    /// Stream length declared by the leading byte.
    pub declared_len: usize,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Number of instructions executed.
    pub instructions: u64,
    /// Whether the stream ended with an end marker.
    pub end_marker: bool,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed compressed stream.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// decode_reader
// ---------------------------------------------------------------------------

/// Read a complete compressed stream from `reader`, decode it and write the
/// output to `writer`.
///
/// The whole input is buffered: the decoder works on one resident buffer.
pub fn decode_reader<R: Read, W: Write>(
    mut reader: R,
    writer: &mut W,
    options: DecodeOptions,
) -> Result<DecodeStats, IoError> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;
    decode_buffer(&input, writer, options)
}

/// Decode an in-memory stream, writing the output to `writer`.
pub fn decode_buffer<W: Write>(
    input: &[u8],
    writer: &mut W,
    options: DecodeOptions,
) -> Result<DecodeStats, IoError> {
    let mut decoder = Decoder::with_options(input, options)?;
    while decoder.step()?.is_some() {}

    let declared_len = decoder.declared_len();
    let instructions = decoder.instructions_decoded();
    let end_marker = decoder.saw_end_marker();
    let output = decoder.into_output()?;

    writer.write_all(&output)?;
    writer.flush()?;

    #[cfg(feature = "file-io")]
    let output_sha256 = Some(sha2::Sha256::digest(&output).into());
    #[cfg(not(feature = "file-io"))]
    let output_sha256: Option<[u8; 32]> = None;

    Ok(DecodeStats {
        input_size: input.len() as u64,
        declared_len,
        output_size: output.len() as u64,
        instructions,
        end_marker,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// decode_file
// ---------------------------------------------------------------------------

/// Decode the compressed file at `input_path`, writing to `output_path`.
///
/// The input is read fully into memory.  The output uses `BufWriter`.
/// When the `file-io` feature is enabled, a SHA-256 checksum of the output
/// is computed.
pub fn decode_file(
    input_path: &Path,
    output_path: &Path,
    options: DecodeOptions,
) -> Result<DecodeStats, IoError> {
    let input_file = File::open(input_path)?;
    let reader = BufReader::with_capacity(BUF_SIZE, input_file);

    // Decode before creating the output so a malformed stream leaves no file.
    let mut staged = Vec::new();
    let stats = decode_reader(reader, &mut staged, options)?;

    let output_file = File::create(output_path)?;
    let mut output_writer = BufWriter::with_capacity(BUF_SIZE, output_file);
    output_writer.write_all(&staged)?;
    output_writer.flush()?;

    Ok(stats)
}

/// Hex-encode a SHA-256 digest.
pub fn digest_hex(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
