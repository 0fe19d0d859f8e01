//! Raspberry Pi GPIO backend over the kernel character device.
//!
//! Input lines are shared between a level reader and an edge source, so
//! both wrap the same `rppal` pin behind a mutex. Edge callbacks run on
//! rppal's interrupt thread.

use core::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::{info, warn};
use rppal::gpio::{Event, Gpio, Trigger};

use crate::app::ports::{EdgeCallback, EdgeSource, GpioBackend, Pull};
use crate::error::{Error, Result};
use crate::events::{Edge, RawEdge};

pub struct RpiGpio {
    gpio: Gpio,
}

impl RpiGpio {
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| {
            warn!("Gpio: cannot open chip: {e}");
            Error::Init("GPIO chip unavailable")
        })?;
        info!("Gpio: opened");
        Ok(Self { gpio })
    }

    fn get(&self, pin: u8) -> Result<rppal::gpio::Pin> {
        self.gpio.get(pin).map_err(|e| {
            warn!("Gpio: pin {pin} unavailable: {e}");
            Error::Init("GPIO pin unavailable")
        })
    }
}

pub struct RpiOutput(rppal::gpio::OutputPin);

impl ErrorType for RpiOutput {
    type Error = Infallible;
}

impl OutputPin for RpiOutput {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.0.set_low();
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.0.set_high();
        Ok(())
    }
}

type SharedInput = Arc<Mutex<rppal::gpio::InputPin>>;

fn lock(pin: &SharedInput) -> MutexGuard<'_, rppal::gpio::InputPin> {
    pin.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct RpiInput(SharedInput);

impl ErrorType for RpiInput {
    type Error = Infallible;
}

impl InputPin for RpiInput {
    fn is_high(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(lock(&self.0).is_high())
    }

    fn is_low(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(lock(&self.0).is_low())
    }
}

pub struct RpiEdges {
    pin: SharedInput,
    number: u8,
}

impl EdgeSource for RpiEdges {
    fn subscribe(&mut self, mut callback: EdgeCallback) -> Result<()> {
        lock(&self.pin)
            .set_async_interrupt(Trigger::Both, None, move |event: Event| {
                let direction = match event.trigger {
                    Trigger::RisingEdge => Edge::Rising,
                    _ => Edge::Falling,
                };
                callback(RawEdge::now(direction));
            })
            .map_err(|e| {
                warn!("Gpio: interrupt on {} failed: {e}", self.number);
                Error::Init("GPIO interrupt registration failed")
            })
    }

    fn unsubscribe(&mut self) -> Result<()> {
        lock(&self.pin).clear_async_interrupt().map_err(|e| {
            warn!("Gpio: clearing interrupt on {} failed: {e}", self.number);
            Error::Init("GPIO interrupt removal failed")
        })
    }
}

impl GpioBackend for RpiGpio {
    type Output = RpiOutput;
    type Input = RpiInput;
    type Edges = RpiEdges;

    fn output(&mut self, pin: u8) -> Result<RpiOutput> {
        Ok(RpiOutput(self.get(pin)?.into_output_low()))
    }

    fn input(&mut self, pin: u8, pull: Pull) -> Result<(RpiInput, RpiEdges)> {
        let line = self.get(pin)?;
        let input = match pull {
            Pull::None => line.into_input(),
            Pull::Up => line.into_input_pullup(),
            Pull::Down => line.into_input_pulldown(),
        };
        let shared = Arc::new(Mutex::new(input));
        Ok((
            RpiInput(shared.clone()),
            RpiEdges {
                pin: shared,
                number: pin,
            },
        ))
    }
}
