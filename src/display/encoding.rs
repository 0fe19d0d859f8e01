//! Character → segment encoding for a 4-digit display with a centre colon.
//!
//! Bit layout per cell (standard 7-segment, bit 7 = colon/dot):
//!
//! ```text
//!     ─0─
//!    5   1
//!     ─6─
//!    4   2
//!     ─3─   7 (colon, cell 1 only)
//! ```

use serde::Serialize;

pub const DIGITS: usize = 4;

/// Segment patterns: `0-9`, `A-Z`, then space, dash and the degree glyph.
pub const SEGMENTS: [u8; 39] = [
    0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F, // 0-9
    0x77, 0x7C, 0x39, 0x5E, 0x79, 0x71, 0x3D, 0x76, 0x06, 0x1E, // A-J
    0x76, 0x38, 0x55, 0x54, 0x3F, 0x73, 0x67, 0x50, 0x6D, 0x78, // K-T
    0x3E, 0x1C, 0x2A, 0x76, 0x6E, 0x5B, // U-Z
    0x00, 0x40, 0x63, // space, dash, degree
];

const SPACE: u8 = SEGMENTS[36];
const DASH: u8 = SEGMENTS[37];
const DEGREE: u8 = SEGMENTS[38];

/// Colon bit, lit on cell 1 when the text contains `:` or `.`.
pub const COLON: u8 = 0x80;

/// Segment bytes for the four cells, left to right.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DisplayFrame(pub [u8; DIGITS]);

impl DisplayFrame {
    pub const BLANK: Self = Self([SPACE; DIGITS]);

    pub fn cells(&self) -> &[u8; DIGITS] {
        &self.0
    }
}

/// Segment pattern for one character. Unknown characters render blank.
pub fn encode_char(ch: char) -> u8 {
    match ch {
        '0'..='9' => SEGMENTS[ch as usize - '0' as usize],
        'A'..='Z' => SEGMENTS[ch as usize - 'A' as usize + 10],
        'a'..='z' => SEGMENTS[ch as usize - 'a' as usize + 10],
        '-' => DASH,
        '*' => DEGREE,
        _ => SPACE,
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, ':' | '.')
}

/// Encode `text` into four cells.
///
/// Separators do not take a cell; any separator lights the colon on cell
/// 1. Short text is padded with blanks on the right, long text is cut.
pub fn encode_text(text: &str) -> DisplayFrame {
    let mut frame = DisplayFrame::BLANK;
    let mut colon = false;
    let mut cell = 0;

    for ch in text.chars() {
        if is_separator(ch) {
            colon = true;
        } else if cell < DIGITS {
            frame.0[cell] = encode_char(ch);
            cell += 1;
        }
    }

    if colon {
        frame.0[1] |= COLON;
    }
    frame
}
