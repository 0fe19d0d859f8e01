//! Coin-operated countdown timer.
//!
//! Each debounced Falling edge on the coin line buys
//! `coin_seconds_per_coin` seconds. The first coin starts the timer; later
//! coins extend the deadline, which stays anchored to the first coin.
//!
//! A tick loop recomputes the remaining time, pushes one
//! [`RemainingTimeEvent`] to every subscriber, then drives the enable
//! output to match `is_running`.
//!
//! ```text
//!   coin ──▶ Debouncer ──▶ on_debounced_edge ──┐
//!                                              ▼
//!   tick loop ──▶ tick_at ──▶ CoinTimerState ──▶ subscribers ──▶ enable pin
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_io_mini::Timer;
use embedded_hal::digital::OutputPin;
use futures_lite::future;
use serde::Serialize;

use crate::app::events::AppEvent;
use crate::app::ports::{EdgeSource, EventSink, RemainingTimeSubscriber};
use crate::error::{Error, GpioError, Result};
use crate::events::{DebouncedEdge, Edge, RemainingTimeEvent};

use super::debounce::Debouncer;

pub const DEFAULT_COIN_SECONDS: u32 = 10;
pub const DEFAULT_TICK: Duration = Duration::from_millis(1000);

/// Timer state. `started_at` is `Some` exactly while `is_running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinTimerState {
    pub is_running: bool,
    pub coins_in: u32,
    pub started_at: Option<Instant>,
    pub remaining_seconds: u32,
    pub total_coins_in_count: u64,
    pub coin_seconds_per_coin: u32,
}

impl CoinTimerState {
    fn new(coin_seconds_per_coin: u32) -> Self {
        Self {
            is_running: false,
            coins_in: 0,
            started_at: None,
            remaining_seconds: 0,
            total_coins_in_count: 0,
            coin_seconds_per_coin,
        }
    }

    /// Account for one coin at `now`.
    pub fn insert_coin(&mut self, now: Instant) {
        if self.is_running {
            self.coins_in = self.coins_in.saturating_add(1);
        } else {
            self.is_running = true;
            self.coins_in = 1;
            self.started_at = Some(now);
        }
        self.total_coins_in_count += 1;
    }

    /// Recompute remaining time at `now`. Expires the timer once nothing
    /// is left.
    pub fn tick(&mut self, now: Instant) -> RemainingTimeEvent {
        let remaining = match (self.is_running, self.started_at) {
            (true, Some(start)) => {
                let bought = u64::from(self.coins_in) * u64::from(self.coin_seconds_per_coin);
                let deadline = start + Duration::from_secs(bought);
                u32::try_from(deadline.saturating_duration_since(now).as_secs()).unwrap_or(u32::MAX)
            }
            _ => 0,
        };

        self.remaining_seconds = remaining;
        if remaining == 0 {
            self.is_running = false;
            self.coins_in = 0;
            self.started_at = None;
            RemainingTimeEvent::EXPIRED
        } else {
            RemainingTimeEvent {
                remaining_seconds: remaining,
                is_running: true,
            }
        }
    }
}

/// Serializable view of [`CoinTimerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoinSnapshot {
    pub is_running: bool,
    pub coins_in: u32,
    pub remaining_seconds: u32,
    pub total_coins_in_count: u64,
}

impl From<CoinTimerState> for CoinSnapshot {
    fn from(s: CoinTimerState) -> Self {
        Self {
            is_running: s.is_running,
            coins_in: s.coins_in,
            remaining_seconds: s.remaining_seconds,
            total_coins_in_count: s.total_coins_in_count,
        }
    }
}

struct Inner<P> {
    state: CoinTimerState,
    enable: P,
    subscribers: Vec<Box<dyn RemainingTimeSubscriber>>,
}

pub struct CoinTimer<P> {
    inner: Mutex<Inner<P>>,
    debouncer: Debouncer,
    tick: Duration,
    enabled: AtomicBool,
}

impl<P: OutputPin + Send> CoinTimer<P> {
    /// Takes ownership of the enable line and drives it LOW.
    pub fn new(
        mut enable: P,
        coin_seconds_per_coin: u32,
        tick: Duration,
        quiet: Duration,
    ) -> Result<Self> {
        enable.set_low().map_err(GpioError::write)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                state: CoinTimerState::new(coin_seconds_per_coin),
                enable,
                subscribers: Vec::new(),
            }),
            debouncer: Debouncer::new(quiet),
            tick,
            enabled: AtomicBool::new(true),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, subscriber: impl RemainingTimeSubscriber + 'static) {
        self.lock().subscribers.push(Box::new(subscriber));
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn state(&self) -> CoinTimerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CoinSnapshot {
        self.state().into()
    }

    pub fn start_monitoring(self: &Arc<Self>, source: &mut impl EdgeSource) -> Result<()>
    where
        P: 'static,
    {
        let this = Arc::clone(self);
        source.subscribe(Box::new(move |edge| this.debouncer.observe(edge)))?;
        log::info!(
            "Coin: monitoring started ({}s per coin)",
            self.lock().state.coin_seconds_per_coin
        );
        Ok(())
    }

    /// Stop the tick loop and detach from the coin line.
    ///
    /// The loop notices on its next iteration, so [`run`](Self::run) may
    /// take up to one tick to return.
    pub fn stop_monitoring(&self, source: &mut impl EdgeSource) -> Result<()> {
        self.enabled.store(false, Ordering::Release);
        source.unsubscribe()
    }

    /// Handle a debounced edge observed at `now`. Only Falling edges are
    /// coins.
    pub fn on_debounced_edge(&self, edge: DebouncedEdge, now: Instant) -> Option<AppEvent> {
        if edge.direction != Edge::Falling {
            return None;
        }
        let mut inner = self.lock();
        inner.state.insert_coin(now);
        log::info!(
            "Coin: accepted ({} in, {} total)",
            inner.state.coins_in,
            inner.state.total_coins_in_count
        );
        Some(AppEvent::CoinAccepted {
            coins_in: inner.state.coins_in,
            total_coins_in: inner.state.total_coins_in_count,
        })
    }

    /// One tick at `now`: update state, notify subscribers, drive the
    /// enable line.
    pub fn tick_at(&self, now: Instant) -> Result<RemainingTimeEvent> {
        let mut inner = self.lock();
        let was_running = inner.state.is_running;
        let event = inner.state.tick(now);

        for subscriber in inner.subscribers.iter_mut() {
            subscriber.on_remaining_time(event);
        }

        if event.is_running {
            inner.enable.set_high().map_err(GpioError::write)?;
        } else {
            inner.enable.set_low().map_err(GpioError::write)?;
        }

        if was_running && !event.is_running {
            log::info!("Coin: time expired");
        }
        Ok(event)
    }

    async fn tick_loop(&self) -> Result<()> {
        while self.enabled.load(Ordering::Acquire) {
            self.tick_at(Instant::now())?;
            Timer::after(self.tick).await;
        }
        Ok(())
    }

    /// Run the tick loop and the coin-line debouncer.
    ///
    /// Returns `Ok(())` once monitoring is stopped, or the first pin error.
    /// The enable output is driven LOW on the way out in both cases.
    pub async fn run(&self, sink: &mut impl EventSink) -> Result<()> {
        let outcome = future::or(
            self.tick_loop(),
            self.debouncer.run(|edge| {
                if let Some(event) = self.on_debounced_edge(edge, Instant::now()) {
                    sink.emit(&event);
                }
                Ok(())
            }),
        )
        .await;

        let released = self
            .lock()
            .enable
            .set_low()
            .map_err(|e| Error::from(GpioError::write(e)));
        match &outcome {
            Ok(()) => log::info!("Coin: monitoring stopped"),
            Err(e) => log::error!("Coin: loop failed: {e}"),
        }
        outcome.and(released)
    }
}
