//! Port traits: the boundary between controller logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PowerController / CoinTimer / Transport
//! ```
//!
//! GPIO backends, event sinks and transport handlers implement these
//! traits. The monitors consume them via generics, so the core never
//! touches a real pin or socket directly and every subsystem can run
//! against the in-memory adapters in tests.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::{Result, TransportError};
use crate::events::{RawEdge, RemainingTimeEvent};

use super::events::AppEvent;

// ───────────────────────────────────────────────────────────────
// Edge source (driven adapter: GPIO interrupt → monitor)
// ───────────────────────────────────────────────────────────────

/// Callback invoked from the GPIO driver's interrupt dispatcher.
///
/// Runs on a driver-owned thread, concurrently with the monitor loops.
/// It must not block.
pub type EdgeCallback = Box<dyn FnMut(RawEdge) + Send + 'static>;

/// A pin that reports both rising and falling transitions.
pub trait EdgeSource {
    /// Register `callback` for every transition. Replaces any previous one.
    fn subscribe(&mut self, callback: EdgeCallback) -> Result<()>;

    /// Drop the registered callback. Calling it with nothing registered
    /// is not an error.
    fn unsubscribe(&mut self) -> Result<()>;
}

/// Input bias applied when a line is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

// ───────────────────────────────────────────────────────────────
// GPIO backend (driven adapter: pin numbering + open)
// ───────────────────────────────────────────────────────────────

/// Opens lines by BCM number.
pub trait GpioBackend {
    type Output: OutputPin + Send + 'static;
    type Input: InputPin + Send + 'static;
    type Edges: EdgeSource + Send + 'static;

    /// Open `pin` as a push-pull output, initially Low.
    fn output(&mut self, pin: u8) -> Result<Self::Output>;

    /// Open `pin` as an input. Returns a level reader and an edge source
    /// for the same line.
    fn input(&mut self, pin: u8, pull: Pull) -> Result<(Self::Input, Self::Edges)>;
}

// ───────────────────────────────────────────────────────────────
// Remaining-time subscriber (domain → display)
// ───────────────────────────────────────────────────────────────

/// Receives one [`RemainingTimeEvent`] per coin-timer tick.
///
/// Called synchronously while the timer's lock is held. Implementations
/// must not call back into the timer.
pub trait RemainingTimeSubscriber: Send {
    fn on_remaining_time(&mut self, event: RemainingTimeEvent);
}

impl<F> RemainingTimeSubscriber for F
where
    F: FnMut(RemainingTimeEvent) + Send,
{
    fn on_remaining_time(&mut self, event: RemainingTimeEvent) {
        self(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink (domain → logging / console)
// ───────────────────────────────────────────────────────────────

/// The monitors emit structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Transport handler (transport → application)
// ───────────────────────────────────────────────────────────────

/// Callbacks from the resilient operator-console link.
///
/// For each connection attempt exactly one of `on_connected` /
/// `on_exception` fires; a live connection ends with exactly one of
/// `on_disconnected` / `on_exception`. `on_data` fires once per complete
/// inbound message.
pub trait TransportHandler: Send {
    fn on_connected(&mut self);
    fn on_disconnected(&mut self);
    fn on_exception(&mut self, error: TransportError);
    fn on_data(&mut self, payload: &[u8]);
}
