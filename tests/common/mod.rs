// Test-only builder for hand-assembled LZO1X streams.
#![allow(dead_code)]

use oxilzo::lzo::length::{LITERAL_RUN_BASE, M3_BASE, M4_BASE, extension_len};

/// Largest declared length the one-byte header can carry.
const MAX_DECLARED: usize = u8::MAX as usize;

#[derive(Default)]
pub struct StreamBuilder {
    body: Vec<u8>,
    starts: Vec<usize>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `0000 LLLL` literal run; `bytes.len() >= 4`.
    pub fn literal_run(mut self, bytes: &[u8]) -> Self {
        assert!(bytes.len() >= 4, "literal runs carry at least 4 bytes");
        self.begin();
        let field = self.push_length(bytes.len() - 3, 15, LITERAL_RUN_BASE);
        self.patch_opcode(field);
        self.body.extend_from_slice(bytes);
        self
    }

    /// M2 copy (3..=8 bytes, distance 1..=2048).
    pub fn m2(mut self, distance: usize, len: usize, trailing: &[u8]) -> Self {
        assert!((3..=8).contains(&len) && (1..=2048).contains(&distance));
        let d = distance - 1;
        let s = trailing_bits(trailing);
        let op = if len <= 4 {
            0x40 | (((len - 3) as u8) << 5) | (((d & 7) as u8) << 2) | s
        } else {
            0x80 | (((len - 5) as u8) << 5) | (((d & 7) as u8) << 2) | s
        };
        self.begin();
        self.patch_opcode(op);
        self.body.push((d >> 3) as u8);
        self.body.extend_from_slice(trailing);
        self
    }

    /// M3 copy (len >= 3, distance 1..=16384).
    pub fn m3(mut self, distance: usize, len: usize, trailing: &[u8]) -> Self {
        assert!(len >= 3 && (1..=16384).contains(&distance));
        self.begin();
        let field = self.push_length(len - 2, 31, M3_BASE);
        self.patch_opcode(0x20 | field);
        self.push_distance_pair(distance - 1, trailing_bits(trailing));
        self.body.extend_from_slice(trailing);
        self
    }

    /// M4 copy (len >= 3, distance 16385..=49151).
    pub fn m4(mut self, distance: usize, len: usize, trailing: &[u8]) -> Self {
        assert!(len >= 3 && (16385..=49151).contains(&distance));
        let x = distance - 16384;
        self.begin();
        let field = self.push_length(len - 2, 7, M4_BASE);
        self.patch_opcode(0x10 | (((x >> 14) as u8) << 3) | field);
        self.push_distance_pair(x & 0x3FFF, trailing_bits(trailing));
        self.body.extend_from_slice(trailing);
        self
    }

    /// End-of-stream marker (`11 SS 00`, a 3-byte M4 copy at distance
    /// 16384) followed by `trailing` literals.
    pub fn end(mut self, trailing: &[u8]) -> Self {
        self.begin();
        self.patch_opcode(0x11);
        self.body.extend_from_slice(&[trailing_bits(trailing), 0x00]);
        self.body.extend_from_slice(trailing);
        self
    }

    /// One instruction given as raw bytes, opcode first.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        let (&opcode, rest) = bytes.split_first().expect("raw instruction needs an opcode");
        self.begin();
        self.patch_opcode(opcode);
        self.body.extend_from_slice(rest);
        self
    }

    /// Bytes appended without starting an instruction.
    pub fn junk(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// Prefix the length byte.  Every instruction must start below it.
    pub fn build(self) -> Vec<u8> {
        let declared = self.body.len().min(MAX_DECLARED);
        for &start in &self.starts {
            assert!(start < declared, "instruction at {start} beyond declared {declared}");
        }
        let mut out = Vec::with_capacity(self.body.len() + 1);
        out.push(declared as u8);
        out.extend_from_slice(&self.body);
        out
    }

    fn begin(&mut self) {
        // +1 for the length byte.
        self.starts.push(self.body.len() + 1);
        self.body.push(0);
    }

    fn patch_opcode(&mut self, opcode: u8) {
        let at = *self.starts.last().unwrap() - 1;
        self.body[at] = opcode;
    }

    /// Append the extension bytes for `value` and return the opcode field.
    fn push_length(&mut self, value: usize, field_max: usize, base: usize) -> u8 {
        let n = extension_len(value, field_max, base);
        if n == 0 {
            return value as u8;
        }
        let zeros = n - 1;
        self.body.extend(std::iter::repeat_n(0u8, zeros));
        self.body.push((value - base - 255 * zeros) as u8);
        0
    }

    fn push_distance_pair(&mut self, field: usize, state: u8) {
        self.body.push((((field & 0x3F) as u8) << 2) | state);
        self.body.push((field >> 6) as u8);
    }
}

fn trailing_bits(trailing: &[u8]) -> u8 {
    assert!(trailing.len() <= 3);
    trailing.len() as u8
}

/// Hex string to bytes (whitespace ignored).
pub fn hex(s: &str) -> Vec<u8> {
    oxilzo::hexdump::parse_hex(s).unwrap()
}
