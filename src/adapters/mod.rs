//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements               | Connects to                |
//! |----------------|--------------------------|----------------------------|
//! | `sim_gpio`     | GpioBackend, EdgeSource  | In-memory pins             |
//! | `rpi_gpio`     | GpioBackend, EdgeSource  | /dev/gpiochip (rppal)      |
//! | `delay`        | DelayNs                  | Spin / sleep               |
//! | `log_sink`     | EventSink                | Console logger             |
//! |                | TransportHandler         |                            |
//! | `cert_store`   | -                        | PEM identity + server pin  |
//! | `ws_transport` | -                        | WebSocket over TLS (rustls)|

pub mod cert_store;
pub mod delay;
pub mod log_sink;
#[cfg(feature = "rpi")]
pub mod rpi_gpio;
pub mod sim_gpio;
pub mod ws_transport;
