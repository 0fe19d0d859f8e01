//! GPIO pin assignments for the DeviceTimer board (BCM numbering).
//!
//! Single source of truth for the defaults; every pin can be overridden in
//! the JSON configuration.

// ---------------------------------------------------------------------------
// Console power button emulation
// ---------------------------------------------------------------------------

/// Digital output: drives the opto-isolator across the console power button.
/// HIGH = button held.
pub const POWER_OUTPUT: u8 = 23;
/// Digital input: console power LED sense. LOW = console powered off.
pub const POWER_SENSE: u8 = 24;

// ---------------------------------------------------------------------------
// Coin acceptor
// ---------------------------------------------------------------------------

/// Digital input: coin acceptor pulse line (pull-down). Falling edge = coin.
pub const COIN_SENSE: u8 = 17;
/// Digital output: relay enabling the console while time remains.
pub const TIMER_ENABLE: u8 = 27;

// ---------------------------------------------------------------------------
// 4-digit segment display (two-wire)
// ---------------------------------------------------------------------------

pub const DISPLAY_CLOCK: u8 = 5;
pub const DISPLAY_DATA: u8 = 6;
