//! Two-wire bit-banged bus for TM1637-style display controllers.
//!
//! ## Wire protocol
//!
//! Every transaction is framed by START (DIO falls while CLK is high) and
//! STOP (DIO rises while CLK is high). Bytes go out LSB first: DIO is set
//! while CLK is low and the chip samples on the CLK rising edge. After
//! eight bits a ninth clock gives the chip its ACK slot. The ACK level is
//! not read back.
//!
//! Sequences are expressed as [`Instruction`] slices and run by
//! [`Bus::execute`]. Each `Delay` holds for `clock_width_us`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::error::GpioError;

/// Data command: write registers, auto-increment address.
pub const CMD_DATA: u8 = 0x40;
/// Address command, OR'd with the first digit register (0).
pub const CMD_ADDRESS: u8 = 0xC0;
/// Display control command, OR'd with [`DISPLAY_ON`] and the brightness.
pub const CMD_DISPLAY_CONTROL: u8 = 0x80;
pub const DISPLAY_ON: u8 = 0x08;

pub const MAX_BRIGHTNESS: u8 = 7;
pub const DEFAULT_CLOCK_WIDTH_US: u32 = 100;

/// One step of a line sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ClockHigh,
    ClockLow,
    DataHigh,
    DataLow,
    Delay,
}

use Instruction::{ClockHigh, ClockLow, DataHigh, DataLow, Delay};

pub const START: &[Instruction] = &[ClockHigh, DataHigh, Delay, DataLow, Delay, ClockLow, Delay];
pub const STOP: &[Instruction] = &[ClockLow, DataLow, Delay, ClockHigh, Delay, DataHigh, Delay];
/// Clock out one bit after DIO has been set.
pub const BIT_CLOCK: &[Instruction] = &[Delay, ClockHigh, Delay, ClockLow, Delay];
/// Ninth clock after a byte.
pub const ACK_SLOT: &[Instruction] = &[ClockLow, Delay, ClockHigh, Delay, ClockLow];

/// Display control byte for `brightness` (clamped) and the on/off flag.
pub fn display_control(brightness: u8, on: bool) -> u8 {
    let mut cmd = CMD_DISPLAY_CONTROL | brightness.min(MAX_BRIGHTNESS);
    if on {
        cmd |= DISPLAY_ON;
    }
    cmd
}

pub struct Bus<CLK, DIO, D> {
    clk: CLK,
    dio: DIO,
    delay: D,
    clock_width_us: u32,
}

impl<CLK, DIO, D> Bus<CLK, DIO, D>
where
    CLK: OutputPin,
    DIO: OutputPin,
    D: DelayNs,
{
    /// Take the lines and park both LOW.
    pub fn new(mut clk: CLK, mut dio: DIO, delay: D, clock_width_us: u32) -> Result<Self, GpioError> {
        clk.set_low().map_err(GpioError::write)?;
        dio.set_low().map_err(GpioError::write)?;
        Ok(Self {
            clk,
            dio,
            delay,
            clock_width_us,
        })
    }

    pub fn execute(&mut self, sequence: &[Instruction]) -> Result<(), GpioError> {
        for step in sequence {
            match step {
                ClockHigh => self.clk.set_high().map_err(GpioError::write)?,
                ClockLow => self.clk.set_low().map_err(GpioError::write)?,
                DataHigh => self.dio.set_high().map_err(GpioError::write)?,
                DataLow => self.dio.set_low().map_err(GpioError::write)?,
                Delay => self.delay.delay_us(self.clock_width_us),
            }
        }
        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), GpioError> {
        for bit in 0..8 {
            let level = if byte & (1 << bit) != 0 { DataHigh } else { DataLow };
            self.execute(&[level])?;
            self.execute(BIT_CLOCK)?;
        }
        self.execute(ACK_SLOT)
    }

    /// START, `bytes`, STOP.
    pub fn transaction(&mut self, bytes: &[u8]) -> Result<(), GpioError> {
        self.execute(START)?;
        for &b in bytes {
            self.write_byte(b)?;
        }
        self.execute(STOP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every line change and delay as an [`Instruction`].
    #[derive(Clone, Default)]
    struct Trace(Rc<RefCell<Vec<Instruction>>>);

    struct Line {
        trace: Trace,
        high: Instruction,
        low: Instruction,
    }

    impl embedded_hal::digital::ErrorType for Line {
        type Error = Infallible;
    }

    impl OutputPin for Line {
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.trace.0.borrow_mut().push(self.high);
            Ok(())
        }
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.trace.0.borrow_mut().push(self.low);
            Ok(())
        }
    }

    impl DelayNs for Trace {
        fn delay_ns(&mut self, _ns: u32) {
            self.0.borrow_mut().push(Delay);
        }
    }

    fn bus() -> (Bus<Line, Line, Trace>, Trace) {
        let trace = Trace::default();
        let clk = Line {
            trace: trace.clone(),
            high: ClockHigh,
            low: ClockLow,
        };
        let dio = Line {
            trace: trace.clone(),
            high: DataHigh,
            low: DataLow,
        };
        let bus = Bus::new(clk, dio, trace.clone(), 1).unwrap();
        trace.0.borrow_mut().clear();
        (bus, trace)
    }

    #[test]
    fn new_parks_lines_low() {
        let trace = Trace::default();
        let clk = Line {
            trace: trace.clone(),
            high: ClockHigh,
            low: ClockLow,
        };
        let dio = Line {
            trace: trace.clone(),
            high: DataHigh,
            low: DataLow,
        };
        let _bus = Bus::new(clk, dio, trace.clone(), 1).unwrap();
        assert_eq!(*trace.0.borrow(), vec![ClockLow, DataLow]);
    }

    #[test]
    fn byte_is_sent_lsb_first_with_ack_clock() {
        let (mut bus, trace) = bus();
        bus.write_byte(0b0000_0001).unwrap();

        let t = trace.0.borrow();
        // 8 × (level + BIT_CLOCK) + ACK_SLOT
        assert_eq!(t.len(), 8 * (1 + BIT_CLOCK.len()) + ACK_SLOT.len());
        assert_eq!(t[0], DataHigh);
        assert_eq!(t[1 + BIT_CLOCK.len()], DataLow);
        assert_eq!(&t[t.len() - ACK_SLOT.len()..], ACK_SLOT);
    }

    #[test]
    fn transaction_is_framed() {
        let (mut bus, trace) = bus();
        bus.transaction(&[CMD_DATA]).unwrap();
        let t = trace.0.borrow();
        assert_eq!(&t[..START.len()], START);
        assert_eq!(&t[t.len() - STOP.len()..], STOP);
    }

    #[test]
    fn control_byte_clamps_brightness() {
        assert_eq!(display_control(7, true), 0x8F);
        assert_eq!(display_control(200, true), 0x8F);
        assert_eq!(display_control(0, true), 0x88);
        assert_eq!(display_control(3, false), 0x83);
    }
}
