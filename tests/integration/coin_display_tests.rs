//! Coin timer → enable line and segment display.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use devicetimer::adapters::sim_gpio::{SimEdgeSource, SimPin};
use devicetimer::app::events::AppEvent;
use devicetimer::display::SegmentDisplay;
use devicetimer::drivers::coin_timer::CoinTimer;
use devicetimer::events::{DebouncedEdge, Edge, RemainingTimeEvent};
use futures_lite::future::block_on;

use crate::mock_hw::{Line, NoDelay, RecordingSink, WireTrace};

fn falling() -> DebouncedEdge {
    DebouncedEdge {
        direction: Edge::Falling,
        timestamp: Instant::now(),
    }
}

#[test]
fn countdown_reaches_display_and_enable_line() {
    let enable = SimPin::new(false);
    let timer = CoinTimer::new(enable.clone(), 10, Duration::from_secs(1), Duration::ZERO).unwrap();

    let trace = WireTrace::new();
    let display =
        SegmentDisplay::new(trace.pin(Line::Clock), trace.pin(Line::Data), NoDelay, 1).unwrap();
    timer.subscribe(display);

    let t0 = Instant::now();
    timer.on_debounced_edge(falling(), t0);
    timer.on_debounced_edge(falling(), t0 + Duration::from_secs(2));

    let ev = timer.tick_at(t0 + Duration::from_secs(5)).unwrap();
    assert_eq!(
        ev,
        RemainingTimeEvent {
            remaining_seconds: 15,
            is_running: true
        }
    );
    assert!(enable.level());
    assert_eq!(trace.transactions()[1], vec![0xC0, 0x00, 0x00, 0x06, 0x6D]);

    trace.take();
    let ev = timer.tick_at(t0 + Duration::from_secs(20)).unwrap();
    assert_eq!(ev, RemainingTimeEvent::EXPIRED);
    assert!(!enable.level());
    assert_eq!(trace.transactions()[1], vec![0xC0, 0x00, 0x3F | 0x80, 0x3F, 0x3F]);

    let state = timer.state();
    assert_eq!(state.total_coins_in_count, 2);
    assert_eq!(state.coins_in, 0);
}

#[test]
fn coin_line_bounce_counts_once_and_expires() {
    let enable = SimPin::new(false);
    let mut edges = SimEdgeSource::new();
    let timer = Arc::new(
        CoinTimer::new(
            enable.clone(),
            1,
            Duration::from_millis(20),
            Duration::from_millis(30),
        )
        .unwrap(),
    );
    timer.start_monitoring(&mut edges).unwrap();

    let sink = RecordingSink::new();
    let worker = {
        let timer = timer.clone();
        let mut sink = sink.clone();
        thread::spawn(move || block_on(timer.run(&mut sink)))
    };

    // Mechanical bounce on a single coin.
    for _ in 0..4 {
        edges.pulse(Edge::Falling);
        edges.pulse(Edge::Rising);
    }
    edges.pulse(Edge::Falling);

    let deadline = Instant::now() + Duration::from_secs(1);
    while !timer.state().is_running && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(timer.state().is_running);

    // One second bought; give the tick loop time to see it expire.
    thread::sleep(Duration::from_millis(1300));
    assert!(!timer.state().is_running);
    assert!(!enable.level());

    timer.stop_monitoring(&mut edges).unwrap();
    worker.join().unwrap().unwrap();

    assert!(!edges.is_subscribed());
    assert_eq!(timer.snapshot().total_coins_in_count, 1);
    assert_eq!(timer.debouncer().raw_count(), 9);
    assert_eq!(
        sink.events(),
        vec![AppEvent::CoinAccepted {
            coins_in: 1,
            total_coins_in: 1
        }]
    );
}

#[test]
fn rising_only_bounce_is_ignored() {
    let enable = SimPin::new(false);
    let timer = CoinTimer::new(enable.clone(), 10, Duration::from_secs(1), Duration::ZERO).unwrap();
    let edge = DebouncedEdge {
        direction: Edge::Rising,
        timestamp: Instant::now(),
    };
    assert_eq!(timer.on_debounced_edge(edge, Instant::now()), None);
    assert_eq!(timer.tick_at(Instant::now()).unwrap(), RemainingTimeEvent::EXPIRED);
    assert!(!enable.level());
}
