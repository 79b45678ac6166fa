//! One stepper axis with its limit switch and operator button.
//!
//! `AxisController` turns pin state into motion commands and events:
//! - the limit switch recalibrates position to zero on its inactive→active edge;
//! - the button is classified into at most one short or long press per physical press;
//! - every `poll` advances the integrator once and pulses the driver when it steps.

use std::time::{Duration, Instant};

use shutter_traits::{DigitalInput, StepperDriver};

use crate::config::{ButtonCfg, IntegratorCfg, MotionCfg};
use crate::error::Result;
use crate::hw_error::hw_report;
use crate::motion::MotionIntegrator;
use crate::util::{steps_to_turns, turns_to_steps};

/// Logical button event produced by one `poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonEvent {
    #[default]
    None,
    ShortPress,
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressState {
    Released,
    PressedPending { since: Instant },
    LongPressSent,
}

pub struct AxisController<D, L, B> {
    motion: MotionIntegrator,
    driver: D,
    limit: L,
    button: B,
    steps_per_rev: u32,
    open_steps: i64,
    limit_latched: bool,
    last_calibration: Option<Instant>,
    press: PressState,
    button_cfg: ButtonCfg,
}

impl<D, L, B> std::fmt::Debug for AxisController<D, L, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisController")
            .field("position", &self.motion.position())
            .field("target", &self.motion.target())
            .field("speed", &self.motion.speed())
            .field("limit_latched", &self.limit_latched)
            .finish()
    }
}

impl<D, L, B> AxisController<D, L, B>
where
    D: StepperDriver,
    L: DigitalInput,
    B: DigitalInput,
{
    /// Build the axis and energise the driver.
    pub fn new(
        mut driver: D,
        limit: L,
        button: B,
        steps_per_rev: u32,
        motion: &MotionCfg,
        integrator: IntegratorCfg,
        button_cfg: ButtonCfg,
    ) -> Result<Self> {
        driver
            .set_enabled(true)
            .map_err(|e| hw_report(&*e, "enabling stepper driver"))?;
        let mut axis = Self {
            motion: MotionIntegrator::new(integrator),
            driver,
            limit,
            button,
            steps_per_rev: steps_per_rev.max(1),
            open_steps: 0,
            limit_latched: false,
            last_calibration: None,
            press: PressState::Released,
            button_cfg,
        };
        axis.apply_motion(motion);
        Ok(axis)
    }

    // ── Motion commands ──────────────────────────────────────────────────────

    pub fn open(&mut self) {
        self.motion.set_target(self.open_steps);
    }

    pub fn close(&mut self) {
        self.motion.set_target(0);
    }

    pub fn stop(&mut self) {
        self.motion.stop();
    }

    pub fn move_relative(&mut self, delta: i64) {
        self.motion.move_by(delta);
    }

    pub fn move_to_steps(&mut self, abs: i64) {
        self.motion.set_target(abs);
    }

    /// Declare the axis to be at `abs` without moving.
    pub fn seed_position(&mut self, abs: i64) {
        self.motion.emergency_stop();
        self.motion.set_position(abs);
        self.motion.set_target(abs);
    }

    /// Load open travel and velocity limits from `cfg`.
    pub fn apply_motion(&mut self, cfg: &MotionCfg) {
        self.open_steps = turns_to_steps(cfg.open_turns, self.steps_per_rev);
        self.motion
            .set_velocity_limits(cfg.max_steps_per_second, cfg.accel_steps_per_second2);
    }

    /// Release the driver outputs (shutdown path).
    pub fn disable(&mut self) -> Result<()> {
        self.motion.emergency_stop();
        self.driver
            .set_enabled(false)
            .map_err(|e| hw_report(&*e, "disabling stepper driver"))
    }

    // ── Polling ──────────────────────────────────────────────────────────────

    /// Service the limit latch, advance the integrator once and classify the button.
    pub fn poll(&mut self, now: Instant) -> Result<ButtonEvent> {
        self.service_limit(now)?;

        if let Some(dir) = self.motion.tick(now) {
            self.driver
                .step(dir.is_forward())
                .map_err(|e| hw_report(&*e, "step pulse"))?;
            tracing::trace!(position = self.motion.position(), ?dir, "step");
            // a step onto the switch latches in the same poll
            self.service_limit(now)?;
        }

        let pressed = self
            .button
            .is_active()
            .map_err(|e| hw_report(&*e, "reading button"))?;
        Ok(self.classify_button(pressed, now))
    }

    /// Recalibrate to 0 on the switch's inactive→active edge.
    fn service_limit(&mut self, now: Instant) -> Result<()> {
        let limit_active = self
            .limit
            .is_active()
            .map_err(|e| hw_report(&*e, "reading limit switch"))?;
        if limit_active && !self.limit_latched {
            self.limit_latched = true;
            self.motion.emergency_stop();
            self.motion.set_position(0);
            self.motion.set_target(0);
            self.last_calibration = Some(now);
            tracing::info!("limit switch engaged, position recalibrated to 0");
        } else if !limit_active {
            self.limit_latched = false;
        }
        Ok(())
    }

    fn classify_button(&mut self, pressed: bool, now: Instant) -> ButtonEvent {
        match (self.press, pressed) {
            (PressState::Released, true) => {
                self.press = PressState::PressedPending { since: now };
                ButtonEvent::None
            }
            (PressState::PressedPending { since }, true) => {
                if held_for(since, now) >= self.button_cfg.long_press {
                    self.press = PressState::LongPressSent;
                    tracing::debug!("button long press");
                    ButtonEvent::LongPress
                } else {
                    ButtonEvent::None
                }
            }
            (PressState::PressedPending { since }, false) => {
                self.press = PressState::Released;
                if held_for(since, now) >= self.button_cfg.debounce {
                    tracing::debug!("button short press");
                    ButtonEvent::ShortPress
                } else {
                    ButtonEvent::None
                }
            }
            (PressState::LongPressSent, false) => {
                self.press = PressState::Released;
                ButtonEvent::None
            }
            (PressState::Released, false) | (PressState::LongPressSent, true) => ButtonEvent::None,
        }
    }
}

impl<D, L, B> AxisController<D, L, B> {
    pub fn is_moving(&self) -> bool {
        self.motion.is_moving()
    }

    pub fn position_steps(&self) -> i64 {
        self.motion.position()
    }

    pub fn position_turns(&self) -> f32 {
        steps_to_turns(self.motion.position(), self.steps_per_rev)
    }

    pub fn open_steps(&self) -> i64 {
        self.open_steps
    }

    pub fn steps_per_rev(&self) -> u32 {
        self.steps_per_rev
    }

    /// Time of the most recent limit-switch recalibration.
    pub fn last_calibration(&self) -> Option<Instant> {
        self.last_calibration
    }

    /// Limit switch held, as of the last poll.
    pub fn limit_engaged(&self) -> bool {
        self.limit_latched
    }

    pub fn motion(&self) -> &MotionIntegrator {
        &self.motion
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

fn held_for(since: Instant, now: Instant) -> Duration {
    now.saturating_duration_since(since)
}
