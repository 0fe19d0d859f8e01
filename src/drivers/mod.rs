//! Input monitors, the coin timer, and worker-thread helpers.

pub mod coin_timer;
pub mod debounce;
pub mod power_button;
pub mod task;
