//! Fuzz target: `encode_text` and the time formatter
//!
//! Arbitrary UTF-8 goes through the segment encoder; the first four bytes
//! also drive `format_seconds_as_time`.
//!
//! Invariants checked:
//! - No panics under any input
//! - The colon bit never appears outside cell 1
//! - Formatted durations always encode to a non-blank frame
//!
//! cargo fuzz run fuzz_display_text

#![no_main]

use devicetimer::display::encoding::{COLON, DisplayFrame, encode_text};
use devicetimer::display::format::format_seconds_as_time;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = core::str::from_utf8(data) {
        let frame = encode_text(text);
        for (i, cell) in frame.cells().iter().enumerate() {
            assert!(i == 1 || cell & COLON == 0, "colon bit on cell {i}");
        }
    }

    if let Some(bytes) = data.get(..4) {
        let seconds = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let text = format_seconds_as_time(seconds);
        assert_ne!(encode_text(&text), DisplayFrame::BLANK, "{seconds}s rendered blank");
    }
});
