//! Display driver → wire protocol, checked by decoding the recorded
//! clock/data trace with a receiver model.

use devicetimer::display::SegmentDisplay;
use devicetimer::error::GpioError;
use embedded_hal::digital::ErrorKind;

use crate::mock_hw::{FailingPin, Line, NoDelay, WirePin, WireTrace};

fn display() -> (SegmentDisplay<WirePin, WirePin, NoDelay>, WireTrace) {
    let trace = WireTrace::new();
    let d = SegmentDisplay::new(trace.pin(Line::Clock), trace.pin(Line::Data), NoDelay, 1).unwrap();
    (d, trace)
}

#[test]
fn time_text_is_sent_as_three_transactions() {
    let (mut d, trace) = display();
    d.show_text("12:34").unwrap();

    assert_eq!(
        trace.transactions(),
        vec![
            vec![0x40],
            vec![0xC0, 0x06, 0x5B | 0x80, 0x4F, 0x66],
            vec![0x8F],
        ]
    );
}

#[test]
fn zero_seconds_shows_blank_hour_and_colon() {
    let (mut d, trace) = display();
    d.show_seconds_as_time(0).unwrap();
    assert_eq!(trace.transactions()[1], vec![0xC0, 0x00, 0x3F | 0x80, 0x3F, 0x3F]);
}

#[test]
fn short_countdown_uses_plain_digits() {
    let (mut d, trace) = display();
    d.show_seconds_as_time(9).unwrap();
    assert_eq!(trace.transactions()[1], vec![0xC0, 0x00, 0x00, 0x00, 0x6F]);
}

#[test]
fn brightness_is_clamped_and_retransmitted() {
    let (mut d, trace) = display();
    d.set_brightness(12).unwrap();
    assert_eq!(d.brightness(), 7);
    assert_eq!(trace.transactions(), vec![vec![0x40], vec![0x8F]]);

    trace.take();
    d.set_brightness(2).unwrap();
    d.show_number(42).unwrap();
    let txns = trace.transactions();
    assert_eq!(txns.last(), Some(&vec![0x8A]));
    assert_eq!(txns[txns.len() - 2], vec![0xC0, 0x00, 0x00, 0x66, 0x5B]);
}

#[test]
fn display_off_clears_control_bit() {
    let (mut d, trace) = display();
    d.set_display_on(false).unwrap();
    assert!(!d.is_on());
    assert_eq!(trace.transactions().last(), Some(&vec![0x87]));
}

#[test]
fn clear_blanks_all_cells() {
    let (mut d, trace) = display();
    d.show_text("8888").unwrap();
    trace.take();
    d.clear().unwrap();
    assert_eq!(trace.transactions()[1], vec![0xC0, 0, 0, 0, 0]);
    assert_eq!(d.frame().0, [0; 4]);
}

#[test]
fn pin_failure_is_reported() {
    let mut d = SegmentDisplay::new(FailingPin::after(2), FailingPin::after(100), NoDelay, 1).unwrap();
    assert_eq!(d.show_text("1"), Err(GpioError::Write(ErrorKind::Other)));
}
