//! Runtime diagnostics.
//!
//! Counters live next to the code that bumps them (debouncers, the power
//! controller, the coin timer, the transport). This module gathers them
//! into one serialisable snapshot, logged periodically by the binary.

use serde::Serialize;

use crate::adapters::ws_transport::TransportStatsSnapshot;
use crate::drivers::coin_timer::CoinSnapshot;
use crate::drivers::debounce::Debouncer;
use crate::drivers::power_button::PowerSnapshot;

/// Raw vs accepted edges for one input line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InputCounters {
    pub raw_edges: u64,
    pub debounced_edges: u64,
}

impl From<&Debouncer> for InputCounters {
    fn from(d: &Debouncer) -> Self {
        Self {
            raw_edges: d.raw_count(),
            debounced_edges: d.debounced_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub uptime_secs: u64,
    pub power: PowerSnapshot,
    pub power_input: InputCounters,
    pub coin: CoinSnapshot,
    pub coin_input: InputCounters,
    pub transport: Option<TransportStatsSnapshot>,
}

impl DiagnosticsSnapshot {
    /// One-line JSON for the log.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}
