//! Fuzz target: `ControllerConfig::from_json`
//!
//! Arbitrary bytes must never panic the loader, and anything it accepts
//! must yield non-zero timings and still pass validation.
//!
//! cargo fuzz run fuzz_config

#![no_main]

use devicetimer::config::ControllerConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = ControllerConfig::from_json(json) else {
        return;
    };
    assert!(config.validate().is_ok());
    assert!(!config.tick().is_zero());
    assert!(!config.pulse_timing().low.is_zero());
    if let Some(transport) = &config.transport {
        assert!(!transport.settings().read_poll.is_zero());
    }
});
