//! Full controller wiring against the simulated GPIO backend.

use std::thread;
use std::time::{Duration, Instant};

use devicetimer::adapters::sim_gpio::SimGpio;
use devicetimer::app::service::App;
use devicetimer::config::ControllerConfig;
use devicetimer::events::Edge;

fn fast_config() -> ControllerConfig {
    let mut c = ControllerConfig::default();
    c.debounce_ms = 20;
    c.tick_ms = 20;
    c.pulse_low_ms = 20;
    c.pulse_high_ms = 20;
    c.coin_seconds_per_coin = 5;
    c.display.clock_width_us = 1;
    c
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn coin_enables_console_and_shutdown_releases_everything() {
    let config = fast_config();
    let mut gpio = SimGpio::new();

    // Console already on: no power pulses expected.
    let power_sense = gpio.pin(config.pins.power_sense);
    power_sense.set_level(true);

    let app = App::start(&mut gpio, &config).unwrap();
    let power_out = gpio.pin(config.pins.power_output);
    let enable = gpio.pin(config.pins.timer_enable);
    let coin = gpio.edges(config.pins.coin_sense);
    let power_edges = gpio.edges(config.pins.power_sense);

    assert!(!power_out.level());
    assert!(coin.is_subscribed());
    assert!(power_edges.is_subscribed());

    coin.pulse(Edge::Falling);
    assert!(wait_until(Duration::from_secs(1), || enable.level()));

    let diag = app.diagnostics();
    assert_eq!(diag.coin.total_coins_in_count, 1);
    assert_eq!(diag.coin_input.raw_edges, 1);
    assert!(diag.transport.is_none());
    assert_eq!(app.display().lock().unwrap().brightness(), 7);

    app.shutdown().unwrap();
    assert!(!power_out.level());
    assert!(!enable.level());
    assert!(!coin.is_subscribed());
    assert!(!power_edges.is_subscribed());
}

#[test]
fn powered_off_console_gets_button_presses() {
    let config = fast_config();
    let mut gpio = SimGpio::new();
    let app = App::start(&mut gpio, &config).unwrap();

    assert!(wait_until(Duration::from_secs(2), || {
        app.power().snapshot().high_pulses >= 1
    }));
    app.shutdown().unwrap();
    assert!(!gpio.pin(config.pins.power_output).level());
}

#[test]
fn invalid_config_is_rejected_before_touching_pins() {
    let mut config = fast_config();
    config.coin_seconds_per_coin = 0;
    let mut gpio = SimGpio::new();
    assert!(App::start(&mut gpio, &config).is_err());
    assert_eq!(gpio.pin(config.pins.power_output).write_count(), 0);
}

#[test]
fn unreadable_identity_fails_start() {
    let mut config = fast_config();
    config.transport = Some(devicetimer::config::TransportConfig {
        uri: "wss://127.0.0.1:1".into(),
        client_cert_path: "/nonexistent/device.pem".into(),
        client_key_path: "/nonexistent/device.key".into(),
        pinned_thumbprint: "AB".repeat(32),
        reconnect_delay_ms: 0,
        read_poll_ms: 10,
        handshake_timeout_ms: 100,
    });
    let mut gpio = SimGpio::new();
    assert!(App::start(&mut gpio, &config).is_err());
}
