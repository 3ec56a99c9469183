// Display helpers for decoded data.
//
// Renders byte buffers as wrapped, prefixed hex dumps and plain text as
// wrapped, prefixed paragraphs.  Also parses hex text back into bytes for
// the CLI's hex input mode.

use thiserror::Error;

/// Default total line width, prefix included.
pub const DEFAULT_WIDTH: usize = 80;

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format `data` as space-separated lowercase hex, wrapped so every line
/// (prefix included) fits in `width` columns.
///
/// The usable width is rounded down to even.  At least one byte is placed on
/// each line even when the prefix leaves no room.
pub fn format_hex(prefix: &str, data: &[u8], width: usize) -> String {
    let mut usable = width.saturating_sub(prefix.chars().count());
    if usable % 2 == 1 {
        usable -= 1;
    }
    // A line of k bytes is 3k - 1 columns wide.
    let per_line = ((usable + 1) / 3).max(1);

    let mut out = String::with_capacity(data.len() * 3 + (data.len() / per_line + 1) * prefix.len());
    for (i, chunk) in data.chunks(per_line).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(prefix);
        for (j, byte) in chunk.iter().enumerate() {
            if j > 0 {
                out.push(' ');
            }
            push_hex_byte(&mut out, *byte);
        }
    }
    out
}

/// Word-wrap `text` so every line (prefix included) fits in `width`
/// columns.  Runs of whitespace collapse to one space; words longer than
/// the usable width are split.
pub fn format_text(prefix: &str, text: &str, width: usize) -> String {
    let usable = width.saturating_sub(prefix.chars().count()).max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_len = 0usize;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        while !chars.is_empty() {
            let sep = usize::from(line_len > 0);
            if line_len + sep + chars.len() <= usable {
                if sep == 1 {
                    line.push(' ');
                }
                line.extend(chars.iter());
                line_len += sep + chars.len();
                chars.clear();
            } else if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            } else {
                // Word longer than a whole line.
                let rest = chars.split_off(usable);
                line.extend(chars.iter());
                lines.push(std::mem::take(&mut line));
                chars = rest;
            }
        }
    }
    if line_len > 0 {
        lines.push(line);
    }

    lines
        .iter()
        .map(|l| format!("{prefix}{l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[inline]
fn push_hex_byte(out: &mut String, byte: u8) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    out.push(DIGITS[usize::from(byte >> 4)] as char);
    out.push(DIGITS[usize::from(byte & 0x0F)] as char);
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HexError {
    /// A character that is neither a hex digit nor whitespace.
    #[error("invalid hex digit {found:?} at position {position}")]
    InvalidDigit { position: usize, found: char },
    /// An odd number of hex digits.
    #[error("odd number of hex digits")]
    OddLength,
}

/// Parse hex text into bytes.  Whitespace is ignored anywhere, so both
/// `"1b 04 11"` and `"1b0411"` are accepted.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let mut out = Vec::with_capacity(text.len() / 2);
    let mut high: Option<u8> = None;
    for (position, c) in text.char_indices() {
        if c.is_whitespace() {
            continue;
        }
        let nibble = c
            .to_digit(16)
            .ok_or(HexError::InvalidDigit { position, found: c })? as u8;
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }
    if high.is_some() {
        return Err(HexError::OddLength);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
