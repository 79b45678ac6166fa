//! Type-state builder for `Controller` and generic `build_controller` constructor.
//!
//! The builder enforces at compile time that a stepper driver and a limit switch
//! are provided before `build()` is available. `try_build()` is always available
//! for dynamic checks. Button and probe are optional.

use std::marker::PhantomData;
use std::sync::Arc;

use shutter_traits::{Clock, DigitalInput, LineSensor, MonotonicClock, StepperDriver};

use crate::axis::AxisController;
use crate::config::{ButtonCfg, ControllerCfg, HomingCfg, MotionCfg, SensorCfg};
use crate::error::{BuildError, Result};
use crate::mocks::{NoButton, NoSensor};
use crate::orchestrator::Orchestrator;

// ── Public dynamic-dispatch alias ────────────────────────────────────────────

/// Orchestrator over boxed hardware, as produced by `ControllerBuilder`.
pub type Controller = Orchestrator<
    Box<dyn StepperDriver>,
    Box<dyn DigitalInput>,
    Box<dyn DigitalInput>,
    Box<dyn LineSensor>,
>;

impl Controller {
    /// Start building a Controller.
    pub fn builder() -> ControllerBuilder<Missing, Missing> {
        ControllerBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Controller`. All values are validated on `build()`.
pub struct ControllerBuilder<D, L> {
    driver: Option<Box<dyn StepperDriver>>,
    limit: Option<Box<dyn DigitalInput>>,
    button: Option<Box<dyn DigitalInput>>,
    sensor: Option<Box<dyn LineSensor>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    cfg: ControllerCfg,
    _d: PhantomData<D>,
    _l: PhantomData<L>,
}

impl Default for ControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            driver: None,
            limit: None,
            button: None,
            sensor: None,
            clock: None,
            cfg: ControllerCfg::default(),
            _d: PhantomData,
            _l: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn unit_factor(v: f32) -> bool {
    v.is_finite() && v > 0.0 && v <= 1.0
}

/// Validate configuration and construct the orchestrator.
///
/// Single source of truth for validation and construction, used by both
/// `ControllerBuilder::try_build()` and `build_controller()`.
fn validate_and_build<D, L, B, S>(
    driver: D,
    limit: L,
    button: B,
    sensor: S,
    cfg: ControllerCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Orchestrator<D, L, B, S>>
where
    D: StepperDriver,
    L: DigitalInput,
    B: DigitalInput,
    S: LineSensor,
{
    // ── Validation ───────────────────────────────────────────────────────────
    if !cfg.motion.is_valid() {
        return Err(invalid("motion parameters must be > 0"));
    }
    if cfg.mechanics.steps_per_rev == 0 {
        return Err(invalid("steps_per_rev must be >= 1"));
    }
    if !(cfg.mechanics.cm_per_turn.is_finite() && cfg.mechanics.cm_per_turn > 0.0) {
        return Err(invalid("cm_per_turn must be > 0"));
    }
    if !(cfg.homing.travel_turns.is_finite() && cfg.homing.travel_turns > 0.0) {
        return Err(invalid("homing travel must be > 0"));
    }
    if cfg.homing.timeout.is_zero() {
        return Err(invalid("homing timeout must be > 0"));
    }
    if !unit_factor(cfg.homing.speed_factor)
        || !unit_factor(cfg.homing.accel_factor)
        || !unit_factor(cfg.homing.seeded_speed_factor)
    {
        return Err(invalid("homing factors must be in (0, 1]"));
    }
    if cfg.button.debounce.is_zero() || cfg.button.long_press <= cfg.button.debounce {
        return Err(invalid("long press must exceed a non-zero debounce"));
    }
    if cfg.sensor.timeout.is_zero() {
        return Err(invalid("sensor timeout must be > 0"));
    }
    if !(cfg.integrator.min_start_sps.is_finite() && cfg.integrator.min_start_sps > 0.0) {
        return Err(invalid("min_start_sps must be > 0"));
    }
    if cfg.integrator.max_step_interval_us == 0 || cfg.integrator.max_dt.is_zero() {
        return Err(invalid("integrator bounds must be > 0"));
    }
    if cfg.event_log_bytes == 0 {
        return Err(invalid("event log budget must be > 0"));
    }

    // ── Construct ────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    let axis = AxisController::new(
        driver,
        limit,
        button,
        cfg.mechanics.steps_per_rev,
        &cfg.motion,
        cfg.integrator,
        cfg.button,
    )?;
    Ok(Orchestrator::new(axis, sensor, clock, &cfg))
}

impl<D, L> ControllerBuilder<D, L> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Controller> {
        let driver = self
            .driver
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDriver))?;
        let limit = self
            .limit
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLimit))?;
        let button = self.button.unwrap_or_else(|| Box::new(NoButton));
        let sensor = self.sensor.unwrap_or_else(|| Box::new(NoSensor));

        validate_and_build(driver, limit, button, sensor, self.cfg, self.clock)
    }
}

/// Chainable setters that do not affect type-state.
impl<D, L> ControllerBuilder<D, L> {
    pub fn with_config(mut self, cfg: ControllerCfg) -> Self {
        self.cfg = cfg;
        self
    }
    pub fn with_motion(mut self, motion: MotionCfg) -> Self {
        self.cfg.motion = motion;
        self
    }
    pub fn with_homing(mut self, homing: HomingCfg) -> Self {
        self.cfg.homing = homing;
        self
    }
    pub fn with_button_cfg(mut self, button: ButtonCfg) -> Self {
        self.cfg.button = button;
        self
    }
    pub fn with_sensor_cfg(mut self, sensor: SensorCfg) -> Self {
        self.cfg.sensor = sensor;
        self
    }
    pub fn with_button(mut self, button: impl DigitalInput + 'static) -> Self {
        self.button = Some(Box::new(button));
        self
    }
    pub fn with_sensor(mut self, sensor: impl LineSensor + 'static) -> Self {
        self.sensor = Some(Box::new(sensor));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<L> ControllerBuilder<Missing, L> {
    pub fn with_driver(self, driver: impl StepperDriver + 'static) -> ControllerBuilder<Set, L> {
        ControllerBuilder {
            driver: Some(Box::new(driver)),
            limit: self.limit,
            button: self.button,
            sensor: self.sensor,
            clock: self.clock,
            cfg: self.cfg,
            _d: PhantomData,
            _l: PhantomData,
        }
    }
}

impl<D> ControllerBuilder<D, Missing> {
    pub fn with_limit(self, limit: impl DigitalInput + 'static) -> ControllerBuilder<D, Set> {
        ControllerBuilder {
            driver: self.driver,
            limit: Some(Box::new(limit)),
            button: self.button,
            sensor: self.sensor,
            clock: self.clock,
            cfg: self.cfg,
            _d: PhantomData,
            _l: PhantomData,
        }
    }
}

impl ControllerBuilder<Set, Set> {
    /// Validate and build. Only available once driver and limit switch are set.
    pub fn build(self) -> Result<Controller> {
        self.try_build()
    }
}

/// Build a statically-dispatched orchestrator from concrete hardware.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_controller<D, L, B, S>(
    driver: D,
    limit: L,
    button: B,
    sensor: S,
    cfg: ControllerCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<Orchestrator<D, L, B, S>>
where
    D: StepperDriver,
    L: DigitalInput,
    B: DigitalInput,
    S: LineSensor,
{
    validate_and_build(driver, limit, button, sensor, cfg, clock)
}
