//! DeviceTimer main entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RpiGpio / SimGpio   LogEventSink   LogTransportHandler        │
//! │  (GpioBackend)       (EventSink)    (TransportHandler)         │
//! │  SpinDelay           ResilientTransport (wss + pinned TLS)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  PowerController · CoinTimer · SegmentDisplay          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runs until a monitor loop fails, then exits non-zero.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info, warn};

use devicetimer::app::ports::GpioBackend;
use devicetimer::app::service::App;
use devicetimer::config::ControllerConfig;

/// Coin-operated console timer controller
#[derive(Parser)]
#[command(name = "devicetimer")]
#[command(version)]
#[command(about = "Coin-operated console timer controller")]
struct Cli {
    /// JSON configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between diagnostics log lines (0 disables)
    #[arg(long, default_value_t = 60)]
    diagnostics_interval: u64,
}

fn load_config(path: Option<&PathBuf>) -> Result<ControllerConfig> {
    let Some(path) = path else {
        info!("Config: none given, using defaults");
        return Ok(ControllerConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = ControllerConfig::from_json(&json)
        .with_context(|| format!("loading config {}", path.display()))?;
    info!("Config: loaded {}", path.display());
    Ok(config)
}

#[cfg(feature = "rpi")]
fn open_gpio() -> Result<devicetimer::adapters::rpi_gpio::RpiGpio> {
    Ok(devicetimer::adapters::rpi_gpio::RpiGpio::new()?)
}

#[cfg(not(feature = "rpi"))]
fn open_gpio() -> Result<devicetimer::adapters::sim_gpio::SimGpio> {
    log::warn!("Gpio: built without `rpi`, using simulated pins");
    Ok(devicetimer::adapters::sim_gpio::SimGpio::new())
}

fn run<B: GpioBackend>(gpio: &mut B, config: &ControllerConfig, cli: &Cli) -> Result<()> {
    let app = App::start(gpio, config).context("starting controller")?;

    let poll = if cli.diagnostics_interval == 0 {
        Duration::from_secs(3600)
    } else {
        Duration::from_secs(cli.diagnostics_interval)
    };

    loop {
        if let Some((name, outcome)) = app.wait_exit(poll) {
            let diag = app.diagnostics();
            if let Err(e) = app.shutdown() {
                warn!("Shutdown after worker exit failed: {}", e);
            }
            match outcome {
                Err(e) => {
                    error!("Worker '{}' failed: {}", name, e);
                    info!("DIAG | {}", diag.to_json());
                    bail!("worker '{name}' failed: {e}");
                }
                Ok(()) => bail!("worker '{name}' stopped unexpectedly"),
            }
        }
        if cli.diagnostics_interval > 0 {
            info!("DIAG | {}", app.diagnostics().to_json());
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!("DeviceTimer v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_ref())?;
    let mut gpio = open_gpio()?;
    run(&mut gpio, &config, &cli)
}
