//! In-memory GPIO backend for host builds and tests.
//!
//! A [`SimPin`] is a shared level: every clone sees the same line, so a
//! test can hold one handle while the controller drives another. Edges
//! are injected by hand through [`SimEdgeSource::inject`]; they are not
//! derived from level changes.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::app::ports::{EdgeCallback, EdgeSource, GpioBackend, Pull};
use crate::error::Result;
use crate::events::{Edge, RawEdge};

#[derive(Debug, Clone, Default)]
pub struct SimPin {
    level: Arc<AtomicBool>,
    writes: Arc<AtomicU64>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(high)),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current level. `true` = HIGH.
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    /// Force the level from outside, e.g. to model the console powering on.
    pub fn set_level(&self, high: bool) {
        self.level.store(high, Ordering::Release);
    }

    /// Number of `set_high`/`set_low` calls made through any handle.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn write(&self, high: bool) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.set_level(high);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.write(true);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(!self.level())
    }
}

// ───────────────────────────────────────────────────────────────
// Edge source
// ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct SimEdgeSource {
    callback: Arc<Mutex<Option<EdgeCallback>>>,
}

impl SimEdgeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `edge` to the registered callback, if any. Returns whether
    /// a callback was registered.
    pub fn inject(&self, edge: RawEdge) -> bool {
        let mut slot = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(cb) => {
                cb(edge);
                true
            }
            None => false,
        }
    }

    /// Inject an edge stamped now.
    pub fn pulse(&self, direction: Edge) -> bool {
        self.inject(RawEdge::now(direction))
    }

    pub fn is_subscribed(&self) -> bool {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl EdgeSource for SimEdgeSource {
    fn subscribe(&mut self, callback: EdgeCallback) -> Result<()> {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<()> {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Backend
// ───────────────────────────────────────────────────────────────

/// Pin registry keyed by BCM number. Repeated opens of the same number
/// return handles to the same line.
#[derive(Default)]
pub struct SimGpio {
    pins: HashMap<u8, SimPin>,
    edges: HashMap<u8, SimEdgeSource>,
}

impl SimGpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&mut self, pin: u8) -> SimPin {
        self.pins.entry(pin).or_default().clone()
    }

    pub fn edges(&mut self, pin: u8) -> SimEdgeSource {
        self.edges.entry(pin).or_default().clone()
    }
}

impl GpioBackend for SimGpio {
    type Output = SimPin;
    type Input = SimPin;
    type Edges = SimEdgeSource;

    fn output(&mut self, pin: u8) -> Result<SimPin> {
        let mut out = self.pin(pin);
        let _ = out.set_low();
        log::debug!("SimGpio: output {} opened", pin);
        Ok(out)
    }

    fn input(&mut self, pin: u8, pull: Pull) -> Result<(SimPin, SimEdgeSource)> {
        let line = self.pin(pin);
        match pull {
            Pull::Up => line.set_level(true),
            Pull::Down => line.set_level(false),
            Pull::None => {}
        }
        log::debug!("SimGpio: input {} opened ({:?})", pin, pull);
        Ok((line, self.edges(pin)))
    }
}
