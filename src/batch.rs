// Parallel decoding of independent streams.
//
// Each decode owns its input slice and output buffer, so streams are
// decoded on the rayon pool without synchronization.  Results keep the
// order of the inputs.

use rayon::prelude::*;

use crate::lzo::decoder::{DecodeError, DecodeOptions, decode_with};

/// Decode every stream in `inputs` in parallel.
pub fn decode_batch<T>(inputs: &[T], options: DecodeOptions) -> Vec<Result<Vec<u8>, DecodeError>>
where
    T: AsRef<[u8]> + Sync,
{
    inputs
        .par_iter()
        .map(|input| decode_with(input.as_ref(), options))
        .collect()
}

/// Decode every stream and concatenate the outputs, failing on the first
/// malformed stream (by input order).
pub fn decode_concat<T>(inputs: &[T], options: DecodeOptions) -> Result<Vec<u8>, DecodeError>
where
    T: AsRef<[u8]> + Sync,
{
    let parts = decode_batch(inputs, options);
    let total = parts
        .iter()
        .map(|p| p.as_ref().map_or(0, Vec::len))
        .sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(&part?);
    }
    Ok(out)
}
