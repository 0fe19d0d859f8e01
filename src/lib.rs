//! DeviceTimer controller library.
//!
//! Coin-operated console timer for a Raspberry Pi: debounced GPIO inputs,
//! power-button emulation, a countdown that drives an enable relay and a
//! 4-digit segment display, and a pinned-TLS WebSocket link to the
//! operator console.
//!
//! Real GPIO access is behind the `rpi` feature; without it the in-memory
//! adapters in [`adapters::sim_gpio`] stand in.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod drivers;
pub mod error;
pub mod events;
pub mod pins;

pub use error::{Error, Result};
