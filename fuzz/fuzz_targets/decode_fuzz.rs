#![no_main]
use libfuzzer_sys::fuzz_target;
use oxilzo::{DecodeOptions, Decoder, decode_with};

fuzz_target!(|data: &[u8]| {
    // Arbitrary input must decode or fail with an error, never panic.
    let opts = DecodeOptions {
        max_output_len: Some(1 << 24),
        ..Default::default()
    };
    let one_shot = decode_with(data, opts);

    // Stepping must agree with the one-shot decode.
    if let Ok(mut decoder) = Decoder::with_options(data, opts) {
        let mut failed = false;
        for step in decoder.by_ref() {
            if step.is_err() {
                failed = true;
                break;
            }
        }
        assert_eq!(failed, one_shot.is_err());
        if let Ok(out) = one_shot {
            assert_eq!(decoder.output(), out.as_slice());
        }
    }
});
