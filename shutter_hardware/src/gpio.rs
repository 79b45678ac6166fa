//! Raspberry Pi GPIO backends for the step/dir driver and polled inputs.

use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use shutter_traits::{BoxError, DigitalInput, StepperDriver};

use crate::error::Result;
use crate::util::{enable_pin_high, spin_for};

/// Minimum STEP high time accepted by common step/dir drivers.
pub const STEP_PULSE: Duration = Duration::from_micros(6);
/// DIR must settle this long before the next STEP edge.
pub const DIR_SETUP: Duration = Duration::from_micros(5);

pub struct GpioStepper {
    step: OutputPin,
    dir: OutputPin,
    enable: Option<OutputPin>,
    enable_active_low: bool,
    forward: Option<bool>,
}

impl GpioStepper {
    pub fn new(
        step_pin: u8,
        dir_pin: u8,
        enable_pin: Option<u8>,
        enable_active_low: bool,
    ) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut step = gpio.get(step_pin)?.into_output();
        step.set_low();
        let dir = gpio.get(dir_pin)?.into_output();
        let enable = match enable_pin {
            Some(p) => {
                let mut pin = gpio.get(p)?.into_output();
                // start released
                pin.write(level(enable_pin_high(false, enable_active_low)));
                Some(pin)
            }
            None => None,
        };
        tracing::debug!(step_pin, dir_pin, ?enable_pin, "gpio stepper ready");
        Ok(Self {
            step,
            dir,
            enable,
            enable_active_low,
            forward: None,
        })
    }
}

fn level(high: bool) -> Level {
    if high { Level::High } else { Level::Low }
}

impl StepperDriver for GpioStepper {
    fn step(&mut self, forward: bool) -> std::result::Result<(), BoxError> {
        if self.forward != Some(forward) {
            self.dir.write(level(forward));
            self.forward = Some(forward);
            spin_for(DIR_SETUP);
        }
        self.step.set_high();
        spin_for(STEP_PULSE);
        self.step.set_low();
        Ok(())
    }

    fn set_enabled(&mut self, on: bool) -> std::result::Result<(), BoxError> {
        if let Some(pin) = self.enable.as_mut() {
            pin.write(level(enable_pin_high(on, self.enable_active_low)));
        }
        Ok(())
    }
}

/// Switch or button input; active-low inputs get the internal pull-up.
pub struct GpioInput {
    pin: InputPin,
    active_low: bool,
}

impl GpioInput {
    pub fn new(pin: u8, active_low: bool) -> Result<Self> {
        let p = Gpio::new()?.get(pin)?;
        let pin = if active_low {
            p.into_input_pullup()
        } else {
            p.into_input_pulldown()
        };
        Ok(Self { pin, active_low })
    }
}

impl DigitalInput for GpioInput {
    fn is_active(&mut self) -> std::result::Result<bool, BoxError> {
        Ok(self.pin.is_low() == self.active_low)
    }
}
