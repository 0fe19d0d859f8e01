//! Application core: controller logic behind port traits.
//!
//! The monitors in [`crate::drivers`] and the display never touch a real
//! pin or socket directly. All interaction happens through the **port
//! traits** in [`ports`], and [`service`] wires concrete adapters to them.

pub mod cancel;
pub mod events;
pub mod ports;
pub mod service;
