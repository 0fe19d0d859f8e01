//! Console power-button emulation.
//!
//! ## Hardware
//!
//! `output` drives an opto-isolator wired across the console's power
//! button (HIGH = button held). `sense` reads the console power LED
//! (LOW = console off).
//!
//! ## Pulse cycle
//!
//! ```text
//!   output LOW ── low phase ──▶ sense LOW? ──yes──▶ output HIGH ── high phase ──┐
//!        ▲                          │no                                          │
//!        └──────────────────────────┴────────────────────────────────────────────┘
//! ```
//!
//! A debounced Rising edge on the sense line (console came on) drives the
//! output LOW at once and aborts any high phase in progress. Cancelling
//! the controller always leaves the output LOW.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::{InputPin, OutputPin};
use futures_lite::future;
use serde::Serialize;

use crate::app::cancel::CancelToken;
use crate::app::events::AppEvent;
use crate::app::ports::{EdgeSource, EventSink};
use crate::error::{GpioError, Result};
use crate::events::{DebouncedEdge, Edge};

use super::debounce::Debouncer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    pub low: Duration,
    pub high: Duration,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            low: Duration::from_millis(5000),
            high: Duration::from_millis(1000),
        }
    }
}

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PowerSnapshot {
    pub pulse_active: bool,
    pub high_pulses: u64,
    pub rising_edges: u64,
    pub falling_edges: u64,
}

struct PowerState<P> {
    output: P,
    counters: PowerSnapshot,
}

pub struct PowerController<P> {
    state: Mutex<PowerState<P>>,
    debouncer: Debouncer,
    timing: PulseTiming,
    cancel: CancelToken,
    pulse_abort: Signal<CriticalSectionRawMutex, ()>,
}

impl<P: OutputPin + Send> PowerController<P> {
    /// Takes ownership of the output line and drives it LOW.
    pub fn new(mut output: P, timing: PulseTiming, quiet: Duration) -> Result<Self> {
        output.set_low().map_err(GpioError::write)?;
        Ok(Self {
            state: Mutex::new(PowerState {
                output,
                counters: PowerSnapshot::default(),
            }),
            debouncer: Debouncer::new(quiet),
            timing,
            cancel: CancelToken::new(),
            pulse_abort: Signal::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, PowerState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn snapshot(&self) -> PowerSnapshot {
        self.lock().counters
    }

    /// Register the raw-edge callback on the sense line.
    pub fn start_monitoring(self: &Arc<Self>, source: &mut impl EdgeSource) -> Result<()>
    where
        P: 'static,
    {
        let this = Arc::clone(self);
        source.subscribe(Box::new(move |edge| this.debouncer.observe(edge)))?;
        log::info!("Power: monitoring started");
        Ok(())
    }

    /// Cancel the loops and detach from the sense line. Idempotent.
    ///
    /// [`run`](Self::run) returns once it observes the cancellation, after
    /// leaving the output LOW.
    pub fn stop_monitoring(&self, source: &mut impl EdgeSource) -> Result<()> {
        self.cancel.cancel();
        source.unsubscribe()
    }

    /// Cancel without touching the edge source.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn drive(&self, high: bool) -> Result<()> {
        let mut st = self.lock();
        if high {
            st.output.set_high().map_err(GpioError::write)?;
            st.counters.high_pulses += 1;
        } else {
            st.output.set_low().map_err(GpioError::write)?;
        }
        st.counters.pulse_active = high;
        Ok(())
    }

    /// React to a debounced transition on the sense line.
    pub fn handle_edge(&self, edge: DebouncedEdge, sink: &mut impl EventSink) -> Result<()> {
        match edge.direction {
            Edge::Rising => {
                {
                    let mut st = self.lock();
                    st.output.set_low().map_err(GpioError::write)?;
                    st.counters.pulse_active = false;
                    st.counters.rising_edges += 1;
                }
                self.pulse_abort.signal(());
                log::info!("Power: console on, releasing button");
            }
            Edge::Falling => {
                self.lock().counters.falling_edges += 1;
                log::info!("Power: console off");
            }
        }
        sink.emit(&AppEvent::PowerButtonChangeDetected(edge.direction));
        Ok(())
    }

    /// Low/high pulse loop. Only returns on a pin error.
    pub async fn pulse_loop<S: InputPin>(&self, sense: &mut S) -> Result<()> {
        loop {
            self.drive(false)?;
            Timer::after(self.timing.low).await;

            let powered_off = sense.is_low().map_err(GpioError::read)?;
            if !powered_off {
                continue;
            }

            self.pulse_abort.reset();
            self.drive(true)?;
            log::debug!("Power: console off, pressing button");
            future::or(
                async {
                    Timer::after(self.timing.high).await;
                },
                self.pulse_abort.wait(),
            )
            .await;
        }
    }

    /// Run the pulse loop and the sense-line debouncer until cancelled.
    ///
    /// Returns `Ok(())` on cancellation, or the first pin error. The
    /// output is driven LOW on the way out in both cases.
    pub async fn run<S: InputPin>(&self, sense: &mut S, sink: &mut impl EventSink) -> Result<()> {
        let work = future::or(
            self.pulse_loop(sense),
            self.debouncer.run(|edge| self.handle_edge(edge, sink)),
        );
        let outcome = future::or(
            async {
                self.cancel.cancelled().await;
                Ok(())
            },
            work,
        )
        .await;

        let released = self.drive(false);
        match &outcome {
            Ok(()) => log::info!("Power: monitoring stopped"),
            Err(e) => log::error!("Power: loop failed: {e}"),
        }
        outcome.and(released)
    }
}
