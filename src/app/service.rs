//! Application wiring.
//!
//! [`App`] opens every line through a [`GpioBackend`], builds the power
//! controller, the coin timer and the display, registers the edge
//! callbacks and starts one worker thread per loop.
//!
//! ```text
//!   power sense ──▶ PowerController ──▶ power output
//!   coin sense  ──▶ CoinTimer ──┬────▶ timer enable
//!                               └────▶ SegmentDisplay
//!   ResilientTransport ◀──▶ operator console
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embedded_hal::digital::OutputPin;
use futures_lite::future;
use log::{info, warn};

use crate::adapters::cert_store::CertificateIdentity;
use crate::adapters::delay::SpinDelay;
use crate::adapters::log_sink::{LogEventSink, LogTransportHandler};
use crate::adapters::ws_transport::ResilientTransport;
use crate::config::ControllerConfig;
use crate::diagnostics::DiagnosticsSnapshot;
use crate::display::SegmentDisplay;
use crate::drivers::coin_timer::CoinTimer;
use crate::drivers::power_button::PowerController;
use crate::drivers::task::{block_on_local, spawn_named};
use crate::error::Result;
use crate::events::RemainingTimeEvent;

use super::ports::{GpioBackend, Pull, RemainingTimeSubscriber};

const MONITOR_STACK_KB: usize = 64;

/// One slot per monitor thread, with headroom.
const EXIT_DEPTH: usize = 4;

pub type SharedDisplay<O> = Arc<Mutex<SegmentDisplay<O, O, SpinDelay>>>;

/// Outcome reported by a monitor thread when its loop ends.
pub type WorkerExit = (&'static str, Result<()>);

type ExitChannel = Channel<CriticalSectionRawMutex, WorkerExit, EXIT_DEPTH>;

/// Feeds coin-timer ticks into the shared display.
struct DisplayFeed<O>(SharedDisplay<O>);

impl<O: OutputPin + Send> RemainingTimeSubscriber for DisplayFeed<O> {
    fn on_remaining_time(&mut self, event: RemainingTimeEvent) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_remaining_time(event);
    }
}

// ───────────────────────────────────────────────────────────────
// App
// ───────────────────────────────────────────────────────────────

pub struct App<B: GpioBackend> {
    power: Arc<PowerController<B::Output>>,
    coin: Arc<CoinTimer<B::Output>>,
    display: SharedDisplay<B::Output>,
    transport: Option<Arc<ResilientTransport>>,
    power_edges: B::Edges,
    coin_edges: B::Edges,
    workers: Vec<(&'static str, JoinHandle<()>)>,
    exits: Arc<ExitChannel>,
    started: Instant,
}

impl<B: GpioBackend> App<B> {
    /// Open the lines, build every subsystem and start the workers.
    pub fn start(gpio: &mut B, config: &ControllerConfig) -> Result<Self> {
        config.validate()?;
        let pins = &config.pins;

        // ── Power button ─────────────────────────────────────
        let power_out = gpio.output(pins.power_output)?;
        let (mut power_sense, mut power_edges) = gpio.input(pins.power_sense, Pull::None)?;
        let power = Arc::new(PowerController::new(
            power_out,
            config.pulse_timing(),
            config.debounce(),
        )?);

        // ── Display ──────────────────────────────────────────
        let mut display = SegmentDisplay::new(
            gpio.output(pins.display_clock)?,
            gpio.output(pins.display_data)?,
            SpinDelay,
            config.display.clock_width_us,
        )?;
        display.set_brightness(config.display.brightness)?;
        display.show_seconds_as_time(0)?;
        let display = Arc::new(Mutex::new(display));

        // ── Coin timer ───────────────────────────────────────
        let enable = gpio.output(pins.timer_enable)?;
        let (_coin_level, mut coin_edges) = gpio.input(pins.coin_sense, Pull::Down)?;
        let coin = Arc::new(CoinTimer::new(
            enable,
            config.coin_seconds_per_coin,
            config.tick(),
            config.debounce(),
        )?);
        coin.subscribe(DisplayFeed(display.clone()));

        // ── Operator link (optional) ─────────────────────────
        let transport = match &config.transport {
            Some(t) => {
                let identity = CertificateIdentity::from_files(
                    &t.client_cert_path,
                    &t.client_key_path,
                    &t.pinned_thumbprint,
                )?;
                Some(Arc::new(ResilientTransport::new(
                    &t.uri,
                    identity,
                    t.settings(),
                )?))
            }
            None => {
                info!("App: operator link disabled");
                None
            }
        };

        // ── Workers ──────────────────────────────────────────
        power.start_monitoring(&mut power_edges)?;
        coin.start_monitoring(&mut coin_edges)?;

        let exits = Arc::new(ExitChannel::new());
        let mut workers = Vec::new();

        let p = power.clone();
        workers.push(spawn_monitor("power", exits.clone(), move || {
            block_on_local(p.run(&mut power_sense, &mut LogEventSink::new()))
        })?);

        let c = coin.clone();
        workers.push(spawn_monitor("coin", exits.clone(), move || {
            block_on_local(c.run(&mut LogEventSink::new()))
        })?);

        if let Some(t) = &transport {
            // Never returns; not joined on shutdown.
            t.clone().spawn(LogTransportHandler)?;
        }

        info!("App: started");
        Ok(Self {
            power,
            coin,
            display,
            transport,
            power_edges,
            coin_edges,
            workers,
            exits,
            started: Instant::now(),
        })
    }

    pub fn power(&self) -> &PowerController<B::Output> {
        &self.power
    }

    pub fn coin(&self) -> &CoinTimer<B::Output> {
        &self.coin
    }

    pub fn display(&self) -> &SharedDisplay<B::Output> {
        &self.display
    }

    pub fn transport(&self) -> Option<&ResilientTransport> {
        self.transport.as_deref()
    }

    /// Wait up to `timeout` for a monitor loop to end.
    pub fn wait_exit(&self, timeout: Duration) -> Option<WorkerExit> {
        future::block_on(future::or(
            async { Some(self.exits.receive().await) },
            async {
                Timer::after(timeout).await;
                None
            },
        ))
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            power: self.power.snapshot(),
            power_input: self.power.debouncer().into(),
            coin: self.coin.snapshot(),
            coin_input: self.coin.debouncer().into(),
            transport: self.transport.as_ref().map(|t| t.stats()),
        }
    }

    /// Stop both monitors, join their threads and blank the display.
    ///
    /// The power output and the timer enable are LOW afterwards. Returns the first loop error,
    /// if any loop ended with one.
    pub fn shutdown(mut self) -> Result<()> {
        self.power.stop_monitoring(&mut self.power_edges)?;
        self.coin.stop_monitoring(&mut self.coin_edges)?;

        for (name, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("App: worker '{}' panicked", name);
            }
        }

        self.display
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear()?;

        let mut first_error = Ok(());
        while let Ok((name, outcome)) = self.exits.try_receive() {
            if let Err(e) = outcome {
                warn!("App: worker '{}' failed: {}", name, e);
                first_error = first_error.and(Err(e));
            }
        }
        info!("App: stopped");
        first_error
    }
}

fn spawn_monitor<F>(
    name: &'static str,
    exits: Arc<ExitChannel>,
    f: F,
) -> Result<(&'static str, JoinHandle<()>)>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    let handle = spawn_named(name, MONITOR_STACK_KB, move || {
        let outcome = f();
        if exits.try_send((name, outcome)).is_err() {
            warn!("App: exit report from '{}' dropped", name);
        }
    })?;
    Ok((name, handle))
}
