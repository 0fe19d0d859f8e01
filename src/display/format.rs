//! Number and duration formatting for the 4-digit display.

use core::fmt::Write;

/// Largest duration shown as `HH:MM` (99 h 59 min).
pub const MAX_TIME_SECONDS: u32 = 99 * 3600 + 59 * 60;
pub const MAX_NUMBER: u32 = 9999;

pub type DisplayText = heapless::String<8>;

/// `n` right-aligned in four cells, capped at 9999.
pub fn format_number(n: u32) -> DisplayText {
    let mut s = DisplayText::new();
    let _ = write!(s, "{:>4}", n.min(MAX_NUMBER));
    s
}

/// Render a duration for the countdown.
///
/// | Seconds            | Shown      |
/// |--------------------|------------|
/// | 0                  | ` 0:00`    |
/// | 1..=59             | plain seconds, right-aligned |
/// | up to 99 h 59 min  | `HH:MM`, hours space-padded |
/// | beyond             | `99:99`    |
pub fn format_seconds_as_time(seconds: u32) -> DisplayText {
    let mut s = DisplayText::new();
    match seconds {
        0 => {
            let _ = s.push_str(" 0:00");
        }
        1..60 => return format_number(seconds),
        _ if seconds <= MAX_TIME_SECONDS => {
            let hours = seconds / 3600;
            let minutes = (seconds % 3600) / 60;
            let _ = write!(s, "{hours:>2}:{minutes:02}");
        }
        _ => {
            let _ = s.push_str("99:99");
        }
    }
    s
}
