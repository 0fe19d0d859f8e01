//! 4-digit segment display driver.
//!
//! ```text
//!   show_* ──▶ format ──▶ encode_text ──▶ DisplayFrame ──▶ Bus (CLK/DIO)
//! ```
//!
//! Each refresh writes three transactions: the data command, the address
//! command followed by the four cell bytes, then display control with the
//! current brightness. The driver is not internally synchronised; callers
//! that share it across threads wrap it in a mutex.

pub mod encoding;
pub mod format;
pub mod protocol;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::app::ports::RemainingTimeSubscriber;
use crate::error::GpioError;
use crate::events::RemainingTimeEvent;

pub use encoding::{DisplayFrame, encode_text};
pub use format::{format_number, format_seconds_as_time};
use protocol::{Bus, CMD_ADDRESS, CMD_DATA, MAX_BRIGHTNESS, display_control};

pub struct SegmentDisplay<CLK, DIO, D> {
    bus: Bus<CLK, DIO, D>,
    brightness: u8,
    on: bool,
    frame: DisplayFrame,
}

impl<CLK, DIO, D> SegmentDisplay<CLK, DIO, D>
where
    CLK: OutputPin,
    DIO: OutputPin,
    D: DelayNs,
{
    pub fn new(clk: CLK, dio: DIO, delay: D, clock_width_us: u32) -> Result<Self, GpioError> {
        Ok(Self {
            bus: Bus::new(clk, dio, delay, clock_width_us)?,
            brightness: MAX_BRIGHTNESS,
            on: true,
            frame: DisplayFrame::BLANK,
        })
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Last frame written to the bus.
    pub fn frame(&self) -> DisplayFrame {
        self.frame
    }

    pub fn show_frame(&mut self, frame: DisplayFrame) -> Result<(), GpioError> {
        self.bus.transaction(&[CMD_DATA])?;

        let mut payload = [CMD_ADDRESS; 1 + encoding::DIGITS];
        payload[1..].copy_from_slice(frame.cells());
        self.bus.transaction(&payload)?;

        self.bus
            .transaction(&[display_control(self.brightness, self.on)])?;
        self.frame = frame;
        Ok(())
    }

    pub fn show_text(&mut self, text: &str) -> Result<(), GpioError> {
        self.show_frame(encode_text(text))
    }

    pub fn show_number(&mut self, n: u32) -> Result<(), GpioError> {
        self.show_text(&format_number(n))
    }

    pub fn show_seconds_as_time(&mut self, seconds: u32) -> Result<(), GpioError> {
        self.show_text(&format_seconds_as_time(seconds))
    }

    pub fn clear(&mut self) -> Result<(), GpioError> {
        self.show_frame(DisplayFrame::BLANK)
    }

    /// Set brightness (clamped to 0..=7) and refresh the control register.
    pub fn set_brightness(&mut self, brightness: u8) -> Result<(), GpioError> {
        self.brightness = brightness.min(MAX_BRIGHTNESS);
        self.write_control()
    }

    pub fn set_display_on(&mut self, on: bool) -> Result<(), GpioError> {
        self.on = on;
        self.write_control()
    }

    fn write_control(&mut self) -> Result<(), GpioError> {
        self.bus.transaction(&[CMD_DATA])?;
        self.bus
            .transaction(&[display_control(self.brightness, self.on)])
    }
}

impl<CLK, DIO, D> RemainingTimeSubscriber for SegmentDisplay<CLK, DIO, D>
where
    CLK: OutputPin + Send,
    DIO: OutputPin + Send,
    D: DelayNs + Send,
{
    fn on_remaining_time(&mut self, event: RemainingTimeEvent) {
        if let Err(e) = self.show_seconds_as_time(event.remaining_seconds) {
            log::warn!("Display: refresh failed: {e}");
        }
    }
}
