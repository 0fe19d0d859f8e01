//! Edge debouncer with a quiet-period window.
//!
//! ## Behaviour
//!
//! Every raw edge restarts the window. An edge is emitted only once the
//! line has been quiet for `quiet` after it, and then only the latest edge
//! of the burst is emitted. A burst that ends in a different direction
//! than it started reports the final direction.
//!
//! | Raw edges (s)            | Quiet | Emitted                  |
//! |--------------------------|-------|--------------------------|
//! | F@0.0 F@0.3 F@0.6        | 1 s   | F at 1.6                 |
//! | F@0.0 R@0.5              | 1 s   | R at 1.5                 |
//! | F@0.0 R@5.0              | 1 s   | F at 1.0, R at 6.0       |
//!
//! [`DebounceWindow`] is the pure state machine, driven by explicit
//! instants. [`Debouncer`] wraps it for the interrupt/async split: the
//! GPIO callback calls [`Debouncer::observe`] and never blocks, a monitor
//! task awaits [`Debouncer::run`].

use core::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;

use crate::error::Result;
use crate::events::{DebouncedEdge, RawEdge};

/// Quiet period used by both input monitors unless configured otherwise.
pub const DEFAULT_QUIET: Duration = Duration::from_millis(1000);

// ───────────────────────────────────────────────────────────────
// Pure window
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DebounceWindow {
    quiet: Duration,
    pending: Option<RawEdge>,
}

impl DebounceWindow {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Feed a raw edge.
    ///
    /// If the previously pending edge had already gone quiet by the time
    /// `edge` arrived, it is returned so the caller can emit it before the
    /// new window starts.
    pub fn observe(&mut self, edge: RawEdge) -> Option<DebouncedEdge> {
        let settled = match self.pending {
            Some(prev) if edge.timestamp >= prev.timestamp + self.quiet => Some(prev.into()),
            _ => None,
        };
        self.pending = Some(edge);
        settled
    }

    /// When the pending edge goes quiet, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|e| e.timestamp + self.quiet)
    }

    /// Emit the pending edge if its window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<DebouncedEdge> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.pending.take().map(Into::into),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }
}

// ───────────────────────────────────────────────────────────────
// Async debouncer
// ───────────────────────────────────────────────────────────────

/// Thread-safe debouncer fed from a GPIO callback.
pub struct Debouncer {
    quiet: Duration,
    latest: Signal<CriticalSectionRawMutex, RawEdge>,
    raw_edges: AtomicU64,
    debounced_edges: AtomicU64,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            latest: Signal::new(),
            raw_edges: AtomicU64::new(0),
            debounced_edges: AtomicU64::new(0),
        }
    }

    /// Record a raw edge. Safe to call from the GPIO dispatcher thread.
    ///
    /// If the monitor task has not picked up the previous edge yet, it is
    /// overwritten. Only the latest edge of a burst matters.
    pub fn observe(&self, edge: RawEdge) {
        self.raw_edges.fetch_add(1, Ordering::Relaxed);
        self.latest.signal(edge);
    }

    /// Total raw edges seen, before filtering.
    pub fn raw_count(&self) -> u64 {
        self.raw_edges.load(Ordering::Relaxed)
    }

    /// Total edges emitted after filtering.
    pub fn debounced_count(&self) -> u64 {
        self.debounced_edges.load(Ordering::Relaxed)
    }

    /// Filter loop. Calls `on_edge` for each debounced edge.
    ///
    /// Runs until `on_edge` fails; the error is returned unchanged.
    pub async fn run<F>(&self, mut on_edge: F) -> Result<()>
    where
        F: FnMut(DebouncedEdge) -> Result<()>,
    {
        let mut window = DebounceWindow::new(self.quiet);

        loop {
            let settled = match window.deadline() {
                None => {
                    let edge = self.latest.wait().await;
                    window.observe(edge)
                }
                Some(deadline) => {
                    let next = future::or(async { Some(self.latest.wait().await) }, async {
                        Timer::after(deadline.saturating_duration_since(Instant::now())).await;
                        None
                    })
                    .await;

                    match next {
                        Some(edge) => window.observe(edge),
                        None => window.poll(Instant::now()),
                    }
                }
            };

            if let Some(edge) = settled {
                self.debounced_edges.fetch_add(1, Ordering::Relaxed);
                on_edge(edge)?;
            }
        }
    }
}
