//! Mock hardware for integration tests.
//!
//! Records every line write so tests can decode the full bus history
//! without touching real GPIO.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use devicetimer::app::events::AppEvent;
use devicetimer::app::ports::EventSink;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

// ── Wire trace ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Clock,
    Data,
}

/// Shared, ordered record of writes to the display lines.
#[derive(Debug, Clone, Default)]
pub struct WireTrace(Arc<Mutex<Vec<(Line, bool)>>>);

#[allow(dead_code)]
impl WireTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&self, line: Line) -> WirePin {
        WirePin {
            trace: self.clone(),
            line,
        }
    }

    pub fn take(&self) -> Vec<(Line, bool)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn transactions(&self) -> Vec<Vec<u8>> {
        decode(&self.0.lock().unwrap())
    }
}

pub struct WirePin {
    trace: WireTrace,
    line: Line,
}

impl ErrorType for WirePin {
    type Error = Infallible;
}

impl OutputPin for WirePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.trace.0.lock().unwrap().push((self.line, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.trace.0.lock().unwrap().push((self.line, true));
        Ok(())
    }
}

/// Delay that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Receiver model ────────────────────────────────────────────

/// Decode a wire trace the way the display chip would.
///
/// START = DIO falls while CLK high, STOP = DIO rises while CLK high.
/// Inside a transaction every CLK rising edge samples DIO; nine samples
/// make a byte (eight data bits LSB first plus the ACK slot). Partial
/// samples before a STOP are dropped.
pub fn decode(trace: &[(Line, bool)]) -> Vec<Vec<u8>> {
    let (mut clk, mut dio) = (false, false);
    let mut in_txn = false;
    let mut bits: Vec<bool> = Vec::new();
    let mut txn: Vec<u8> = Vec::new();
    let mut out = Vec::new();

    for &(line, level) in trace {
        match line {
            Line::Clock => {
                if in_txn && !clk && level {
                    bits.push(dio);
                    if bits.len() == 9 {
                        let byte = bits[..8]
                            .iter()
                            .enumerate()
                            .fold(0u8, |acc, (i, &b)| acc | (u8::from(b) << i));
                        txn.push(byte);
                        bits.clear();
                    }
                }
                clk = level;
            }
            Line::Data => {
                if clk && dio && !level {
                    in_txn = true;
                    bits.clear();
                    txn.clear();
                } else if clk && !dio && level && in_txn {
                    in_txn = false;
                    out.push(std::mem::take(&mut txn));
                }
                dio = level;
            }
        }
    }
    out
}

// ── Failing pin ───────────────────────────────────────────────

/// Output that succeeds `ok_writes` times, then fails every write.
pub struct FailingPin {
    ok_writes: usize,
}

#[allow(dead_code)]
impl FailingPin {
    pub fn after(ok_writes: usize) -> Self {
        Self { ok_writes }
    }
}

impl ErrorType for FailingPin {
    type Error = ErrorKind;
}

impl OutputPin for FailingPin {
    fn set_low(&mut self) -> Result<(), ErrorKind> {
        self.write()
    }

    fn set_high(&mut self) -> Result<(), ErrorKind> {
        self.write()
    }
}

impl FailingPin {
    fn write(&mut self) -> Result<(), ErrorKind> {
        if self.ok_writes == 0 {
            return Err(ErrorKind::Other);
        }
        self.ok_writes -= 1;
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Collects every emitted event.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink(pub Arc<Mutex<Vec<AppEvent>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.0.lock().unwrap().push(*event);
    }
}
