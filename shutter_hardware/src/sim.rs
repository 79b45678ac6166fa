//! In-process mechanism used by the CLI `--sim` mode and the integration tests.
//!
//! One `SimMechanism` owns the physical state; the driver, inputs and probe it
//! hands out are views onto it, so the limit switch and the distance probe
//! follow whatever the driver does.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use shutter_traits::{BoxError, DigitalInput, LineSensor, StepperDriver};

use crate::error::HwError;

#[derive(Debug)]
struct State {
    position: Cell<i64>,
    steps: Cell<u64>,
    enabled: Cell<bool>,
    limit_works: Cell<bool>,
    button: Cell<bool>,
    probe_online: Cell<bool>,
    temperature_c: Cell<f32>,
    steps_per_rev: u32,
    cm_per_turn: f32,
}

impl State {
    fn distance_cm(&self) -> f32 {
        self.position.get() as f32 / self.steps_per_rev as f32 * self.cm_per_turn
    }
}

/// Shared simulated shutter axis.
#[derive(Debug, Clone)]
pub struct SimMechanism {
    state: Rc<State>,
}

impl SimMechanism {
    /// Mechanism resting `position` steps above the closed end stop.
    pub fn new(position: i64, steps_per_rev: u32, cm_per_turn: f32) -> Self {
        Self {
            state: Rc::new(State {
                position: Cell::new(position),
                steps: Cell::new(0),
                enabled: Cell::new(false),
                limit_works: Cell::new(true),
                button: Cell::new(false),
                probe_online: Cell::new(true),
                temperature_c: Cell::new(21.0),
                steps_per_rev: steps_per_rev.max(1),
                cm_per_turn,
            }),
        }
    }

    pub fn position(&self) -> i64 {
        self.state.position.get()
    }

    /// Total pulses emitted in either direction.
    pub fn steps(&self) -> u64 {
        self.state.steps.get()
    }

    pub fn enabled(&self) -> bool {
        self.state.enabled.get()
    }

    pub fn distance_cm(&self) -> f32 {
        self.state.distance_cm()
    }

    /// A broken switch never reports the end stop.
    pub fn set_limit_working(&self, works: bool) {
        self.state.limit_works.set(works);
    }

    pub fn set_button(&self, pressed: bool) {
        self.state.button.set(pressed);
    }

    /// An offline probe never answers.
    pub fn set_probe_online(&self, online: bool) {
        self.state.probe_online.set(online);
    }

    pub fn set_temperature_c(&self, t: f32) {
        self.state.temperature_c.set(t);
    }

    pub fn stepper(&self) -> SimStepper {
        SimStepper {
            state: Rc::clone(&self.state),
        }
    }

    pub fn limit(&self) -> SimLimit {
        SimLimit {
            state: Rc::clone(&self.state),
        }
    }

    pub fn button(&self) -> SimButton {
        SimButton {
            state: Rc::clone(&self.state),
        }
    }

    pub fn probe(&self) -> SimProbe {
        SimProbe {
            state: Rc::clone(&self.state),
        }
    }
}

pub struct SimStepper {
    state: Rc<State>,
}

impl StepperDriver for SimStepper {
    fn step(&mut self, forward: bool) -> Result<(), BoxError> {
        if !self.state.enabled.get() {
            return Err(Box::new(HwError::Gpio("step pulse while driver disabled".into())));
        }
        let p = self.state.position.get();
        self.state.position.set(if forward { p + 1 } else { p - 1 });
        self.state.steps.set(self.state.steps.get() + 1);
        Ok(())
    }

    fn set_enabled(&mut self, on: bool) -> Result<(), BoxError> {
        tracing::trace!(on, "sim driver enable");
        self.state.enabled.set(on);
        Ok(())
    }
}

/// Closed-end switch: active at or below position zero.
pub struct SimLimit {
    state: Rc<State>,
}

impl DigitalInput for SimLimit {
    fn is_active(&mut self) -> Result<bool, BoxError> {
        Ok(self.state.limit_works.get() && self.state.position.get() <= 0)
    }
}

pub struct SimButton {
    state: Rc<State>,
}

impl DigitalInput for SimButton {
    fn is_active(&mut self) -> Result<bool, BoxError> {
        Ok(self.state.button.get())
    }
}

/// Answers `D` with the current distance and `T` with the set temperature.
pub struct SimProbe {
    state: Rc<State>,
}

impl LineSensor for SimProbe {
    fn query(&mut self, command: u8, _timeout: Duration) -> Result<Option<String>, BoxError> {
        if !self.state.probe_online.get() {
            return Ok(None);
        }
        let reply = match command {
            b'D' => format!("$DST:{:.3}", self.state.distance_cm()),
            b'T' => format!("$TMP:{:.1}", self.state.temperature_c.get()),
            other => {
                tracing::debug!(command = %char::from(other), "sim probe ignores command");
                return Ok(None);
            }
        };
        Ok(Some(reply))
    }
}
