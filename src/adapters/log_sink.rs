//! Log-based adapters.
//!
//! [`LogEventSink`] writes application events to the console logger and
//! [`LogTransportHandler`] does the same for operator-link callbacks.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, TransportHandler};
use crate::error::TransportError;

/// Longest inbound payload echoed to the log.
const PREVIEW_CHARS: usize = 64;

#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::PowerButtonChangeDetected(edge) => {
                info!("POWER | sense changed: {:?}", edge);
            }
            AppEvent::CoinAccepted {
                coins_in,
                total_coins_in,
            } => {
                info!("COIN | coins_in={} total={}", coins_in, total_coins_in);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct LogTransportHandler;

impl TransportHandler for LogTransportHandler {
    fn on_connected(&mut self) {
        info!("LINK | connected");
    }

    fn on_disconnected(&mut self) {
        info!("LINK | disconnected");
    }

    fn on_exception(&mut self, error: TransportError) {
        warn!("LINK | error: {}", error);
    }

    fn on_data(&mut self, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        info!("LINK | received {}B: {}", payload.len(), preview);
    }
}
