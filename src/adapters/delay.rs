//! Microsecond delay for bit-banged buses.
//!
//! `thread::sleep` overshoots by tens of microseconds on Linux, which
//! would stretch every display clock phase, so short waits spin.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

/// Waits at or above this length sleep instead of spinning.
const SPIN_LIMIT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, Default)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let wait = Duration::from_nanos(u64::from(ns));
        if wait >= SPIN_LIMIT {
            std::thread::sleep(wait);
            return;
        }
        let until = Instant::now() + wait;
        while Instant::now() < until {
            std::hint::spin_loop();
        }
    }
}
