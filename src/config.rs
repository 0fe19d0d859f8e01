//! Controller configuration.
//!
//! Loaded from a JSON file at startup; every field has a default so a
//! partial file (or none at all) is valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::ws_transport::TransportSettings;
use crate::display::protocol::{DEFAULT_CLOCK_WIDTH_US, MAX_BRIGHTNESS};
use crate::drivers::power_button::PulseTiming;
use crate::error::{Error, Result};
use crate::pins;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub pins: PinConfig,

    // --- Inputs ---
    /// Quiet period before an input edge is accepted (milliseconds)
    pub debounce_ms: u64,

    // --- Coin timer ---
    /// Seconds of play bought by one coin
    pub coin_seconds_per_coin: u32,
    /// Countdown tick interval (milliseconds)
    pub tick_ms: u64,

    // --- Power button ---
    /// Button released between pulses (milliseconds)
    pub pulse_low_ms: u64,
    /// Button held while the console is off (milliseconds)
    pub pulse_high_ms: u64,

    pub display: DisplayConfig,

    /// Operator-console link. Disabled when absent.
    pub transport: Option<TransportConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            debounce_ms: 1000,
            coin_seconds_per_coin: 10,
            tick_ms: 1000,
            pulse_low_ms: 5000,
            pulse_high_ms: 1000,
            display: DisplayConfig::default(),
            transport: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    pub power_output: u8,
    pub power_sense: u8,
    pub coin_sense: u8,
    pub timer_enable: u8,
    pub display_clock: u8,
    pub display_data: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            power_output: pins::POWER_OUTPUT,
            power_sense: pins::POWER_SENSE,
            coin_sense: pins::COIN_SENSE,
            timer_enable: pins::TIMER_ENABLE,
            display_clock: pins::DISPLAY_CLOCK,
            display_data: pins::DISPLAY_DATA,
        }
    }
}

impl PinConfig {
    fn all(&self) -> [u8; 6] {
        [
            self.power_output,
            self.power_sense,
            self.coin_sense,
            self.timer_enable,
            self.display_clock,
            self.display_data,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Half-period of the display clock (microseconds)
    pub clock_width_us: u32,
    /// 0..=7
    pub brightness: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            clock_width_us: DEFAULT_CLOCK_WIDTH_US,
            brightness: MAX_BRIGHTNESS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// `wss://host[:port]/path`
    pub uri: String,
    pub client_cert_path: PathBuf,
    pub client_key_path: PathBuf,
    /// Uppercase hex SHA-256 of the server certificate (DER)
    pub pinned_thumbprint: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_read_poll_ms")]
    pub read_poll_ms: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_read_poll_ms() -> u64 {
    100
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

impl TransportConfig {
    pub fn settings(&self) -> TransportSettings {
        TransportSettings {
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            read_poll: Duration::from_millis(self.read_poll_ms),
            handshake_timeout: Duration::from_millis(self.handshake_timeout_ms),
        }
    }
}

impl ControllerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            log::warn!("Config: parse error: {e}");
            Error::Config("malformed JSON")
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.coin_seconds_per_coin == 0 {
            return Err(Error::Config("coin_seconds_per_coin must be positive"));
        }
        if self.tick_ms == 0 {
            return Err(Error::Config("tick_ms must be positive"));
        }
        if self.pulse_low_ms == 0 {
            return Err(Error::Config("pulse_low_ms must be positive"));
        }
        if self.display.brightness > MAX_BRIGHTNESS {
            return Err(Error::Config("display brightness must be 0..=7"));
        }

        let pins = self.pins.all();
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(Error::Config("pin assigned twice"));
            }
        }

        if let Some(t) = &self.transport {
            if t.pinned_thumbprint.is_empty() {
                return Err(Error::Config("pinned_thumbprint is empty"));
            }
            if t.read_poll_ms == 0 {
                return Err(Error::Config("read_poll_ms must be positive"));
            }
            if t.handshake_timeout_ms == 0 {
                return Err(Error::Config("handshake_timeout_ms must be positive"));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn pulse_timing(&self) -> PulseTiming {
        PulseTiming {
            low: Duration::from_millis(self.pulse_low_ms),
            high: Duration::from_millis(self.pulse_high_ms),
        }
    }
}
