//! Outbound application events.
//!
//! The monitors emit these through the [`EventSink`](super::ports::EventSink)
//! port. Adapters on the other side decide what to do with them, e.g. log to
//! the console, forward to the operator link, etc.

use crate::events::Edge;

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Debounced transition on the console power-sense line.
    PowerButtonChangeDetected(Edge),

    /// A coin was accepted.
    CoinAccepted { coins_in: u32, total_coins_in: u64 },
}
