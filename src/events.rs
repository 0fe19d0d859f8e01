//! Value types flowing between the input monitors, the timer and the display.
//!
//! ```text
//! ┌─────────────┐ RawEdge ┌────────────┐ DebouncedEdge ┌──────────────────┐
//! │ GPIO driver │────────▶│ Debouncer  │──────────────▶│ PowerController  │
//! │ (interrupt) │         │ (1 s quiet)│               │ CoinTimer        │
//! └─────────────┘         └────────────┘               └────────┬─────────┘
//!                                                               │ RemainingTimeEvent
//!                                                               ▼
//!                                                      ┌──────────────────┐
//!                                                      │ SegmentDisplay   │
//!                                                      └──────────────────┘
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Direction of a pin transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Rising,
    Falling,
}

/// One hardware transition as reported by the GPIO driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEdge {
    pub direction: Edge,
    pub timestamp: Instant,
}

impl RawEdge {
    pub fn new(direction: Edge, timestamp: Instant) -> Self {
        Self {
            direction,
            timestamp,
        }
    }

    /// Edge stamped with the current time.
    pub fn now(direction: Edge) -> Self {
        Self::new(direction, Instant::now())
    }
}

/// A transition that survived the quiet window.
///
/// `timestamp` is the time of the raw edge that won, not the time the
/// quiet window expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncedEdge {
    pub direction: Edge,
    pub timestamp: Instant,
}

impl From<RawEdge> for DebouncedEdge {
    fn from(raw: RawEdge) -> Self {
        Self {
            direction: raw.direction,
            timestamp: raw.timestamp,
        }
    }
}

/// Pushed once per coin-timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingTimeEvent {
    pub remaining_seconds: u32,
    pub is_running: bool,
}

impl RemainingTimeEvent {
    /// The event emitted whenever the timer is idle or has just expired.
    pub const EXPIRED: Self = Self {
        remaining_seconds: 0,
        is_running: false,
    };
}
