//! PowerController against simulated pins, with shortened timings.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use devicetimer::adapters::sim_gpio::{SimEdgeSource, SimPin};
use devicetimer::app::events::AppEvent;
use devicetimer::drivers::power_button::{PowerController, PulseTiming};
use devicetimer::error::{Error, GpioError};
use devicetimer::events::Edge;
use embedded_hal::digital::ErrorKind;
use futures_lite::future::block_on;

use crate::mock_hw::{FailingPin, RecordingSink};

const QUIET: Duration = Duration::from_millis(20);

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

struct Rig {
    ctl: Arc<PowerController<SimPin>>,
    output: SimPin,
    sense: SimPin,
    edges: SimEdgeSource,
    sink: RecordingSink,
    worker: thread::JoinHandle<devicetimer::Result<()>>,
}

fn start(timing: PulseTiming, console_on: bool) -> Rig {
    let output = SimPin::new(false);
    let sense = SimPin::new(console_on);
    let mut edges = SimEdgeSource::new();
    let sink = RecordingSink::new();

    let ctl = Arc::new(PowerController::new(output.clone(), timing, QUIET).unwrap());
    ctl.start_monitoring(&mut edges).unwrap();

    let worker = {
        let ctl = ctl.clone();
        let mut sense = sense.clone();
        let mut sink = sink.clone();
        thread::spawn(move || block_on(ctl.run(&mut sense, &mut sink)))
    };

    Rig {
        ctl,
        output,
        sense,
        edges,
        sink,
        worker,
    }
}

#[test]
fn console_off_gets_pulsed() {
    let rig = start(
        PulseTiming {
            low: Duration::from_millis(20),
            high: Duration::from_millis(20),
        },
        false,
    );

    assert!(wait_until(Duration::from_secs(2), || rig.ctl.snapshot().high_pulses >= 2));

    let mut edges = rig.edges.clone();
    rig.ctl.stop_monitoring(&mut edges).unwrap();
    rig.worker.join().unwrap().unwrap();
    assert!(!rig.output.level());
}

#[test]
fn console_on_is_never_pulsed() {
    let rig = start(
        PulseTiming {
            low: Duration::from_millis(10),
            high: Duration::from_millis(10),
        },
        true,
    );

    thread::sleep(Duration::from_millis(100));
    assert_eq!(rig.ctl.snapshot().high_pulses, 0);
    assert!(!rig.output.level());

    rig.ctl.cancel();
    rig.worker.join().unwrap().unwrap();
}

#[test]
fn rising_edge_aborts_high_phase() {
    let rig = start(
        PulseTiming {
            low: Duration::from_millis(10),
            high: Duration::from_secs(30),
        },
        false,
    );

    assert!(wait_until(Duration::from_secs(2), || rig.ctl.snapshot().pulse_active));
    assert!(rig.output.level());

    // Console comes on: the LED line bounces, then settles high.
    rig.sense.set_level(true);
    rig.edges.pulse(Edge::Rising);
    rig.edges.pulse(Edge::Falling);
    rig.edges.pulse(Edge::Rising);

    assert!(wait_until(Duration::from_secs(2), || rig.ctl.snapshot().rising_edges == 1));
    assert!(!rig.output.level());
    assert!(!rig.ctl.snapshot().pulse_active);
    assert_eq!(
        rig.sink.events(),
        vec![AppEvent::PowerButtonChangeDetected(Edge::Rising)]
    );

    // The next low phase sees the console on and leaves the button alone.
    thread::sleep(Duration::from_millis(60));
    assert_eq!(rig.ctl.snapshot().high_pulses, 1);

    rig.ctl.cancel();
    rig.worker.join().unwrap().unwrap();
}

#[test]
fn stop_monitoring_unsubscribes_and_is_idempotent() {
    let rig = start(PulseTiming::default(), true);
    let mut edges = rig.edges.clone();

    rig.ctl.stop_monitoring(&mut edges).unwrap();
    rig.ctl.stop_monitoring(&mut edges).unwrap();
    rig.worker.join().unwrap().unwrap();

    assert!(!rig.edges.is_subscribed());
    assert!(!rig.output.level());
}

#[test]
fn output_failure_ends_the_loop() {
    // First write (constructor) succeeds, the first pulse-loop write fails.
    let ctl = PowerController::new(FailingPin::after(1), PulseTiming::default(), QUIET).unwrap();
    let mut sense = SimPin::new(false);
    let mut sink = RecordingSink::new();

    let outcome = block_on(ctl.run(&mut sense, &mut sink));
    assert_eq!(outcome, Err(Error::Gpio(GpioError::Write(ErrorKind::Other))));
}
