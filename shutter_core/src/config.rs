//! Runtime configuration types for the controller.
//!
//! These are the values the orchestrator and axis work with. They are separate
//! from the TOML-deserialized config in `shutter_config`; see `conversions`.

use std::time::Duration;

/// Opening travel and velocity profile of the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCfg {
    pub open_turns: f32,
    pub max_steps_per_second: f32,
    pub accel_steps_per_second2: f32,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            open_turns: 10.0,
            max_steps_per_second: 3200.0,
            accel_steps_per_second2: 800.0,
        }
    }
}

impl MotionCfg {
    /// All three parameters strictly positive and finite.
    pub fn is_valid(&self) -> bool {
        [
            self.open_turns,
            self.max_steps_per_second,
            self.accel_steps_per_second2,
        ]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
    }

    /// Profile scaled down for homing; both limits floored at 1.0.
    pub fn scaled(&self, speed_factor: f32, accel_factor: f32) -> Self {
        Self {
            open_turns: self.open_turns,
            max_steps_per_second: (self.max_steps_per_second.max(1.0) * speed_factor).max(1.0),
            accel_steps_per_second2: (self.accel_steps_per_second2.max(1.0) * accel_factor)
                .max(1.0),
        }
    }
}

/// Drive train geometry.
#[derive(Debug, Clone, Copy)]
pub struct MechanicsCfg {
    /// Full steps per revolution times microstep factor.
    pub steps_per_rev: u32,
    pub cm_per_turn: f32,
}

impl Default for MechanicsCfg {
    fn default() -> Self {
        Self {
            steps_per_rev: 2000,
            cm_per_turn: 25.4466,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HomingCfg {
    pub travel_turns: f32,
    pub timeout: Duration,
    pub speed_factor: f32,
    pub accel_factor: f32,
    pub seeded_speed_factor: f32,
}

impl Default for HomingCfg {
    fn default() -> Self {
        Self {
            travel_turns: 40.0,
            timeout: Duration::from_millis(30_000),
            speed_factor: 0.25,
            accel_factor: 0.25,
            seeded_speed_factor: 0.5,
        }
    }
}

/// What a short press does while the axis is at rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonPolicy {
    /// Open when at zero, close from anywhere else.
    #[default]
    Position,
    /// Reverse the last motion started.
    Toggle,
}

#[derive(Debug, Clone, Copy)]
pub struct ButtonCfg {
    pub debounce: Duration,
    pub long_press: Duration,
    pub policy: ButtonPolicy,
}

impl Default for ButtonCfg {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(125),
            long_press: Duration::from_millis(5_000),
            policy: ButtonPolicy::Position,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SensorCfg {
    /// Max wait for one reply line.
    pub timeout: Duration,
    /// Minimum spacing of temperature queries while at rest.
    pub temperature_poll: Duration,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2_000),
            temperature_poll: Duration::from_millis(5_000),
        }
    }
}

/// Tuning of the step scheduler.
#[derive(Debug, Clone, Copy)]
pub struct IntegratorCfg {
    /// Speed used to time the first steps out of rest.
    pub min_start_sps: f32,
    pub max_step_interval_us: u64,
    /// Upper bound of one integration step.
    pub max_dt: Duration,
}

impl Default for IntegratorCfg {
    fn default() -> Self {
        Self {
            min_start_sps: 2.0,
            max_step_interval_us: 50_000,
            max_dt: Duration::from_millis(50),
        }
    }
}

/// Everything the orchestrator needs besides its hardware.
#[derive(Debug, Clone, Copy)]
pub struct ControllerCfg {
    pub motion: MotionCfg,
    pub mechanics: MechanicsCfg,
    pub homing: HomingCfg,
    pub button: ButtonCfg,
    pub sensor: SensorCfg,
    pub integrator: IntegratorCfg,
    /// Byte budget of the operator event log.
    pub event_log_bytes: usize,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            motion: MotionCfg::default(),
            mechanics: MechanicsCfg::default(),
            homing: HomingCfg::default(),
            button: ButtonCfg::default(),
            sensor: SensorCfg::default(),
            integrator: IntegratorCfg::default(),
            event_log_bytes: crate::event_log::DEFAULT_EVENT_LOG_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_profile_floors_at_one() {
        let tiny = MotionCfg {
            open_turns: 1.0,
            max_steps_per_second: 2.0,
            accel_steps_per_second2: 0.5,
        };
        let slow = tiny.scaled(0.25, 0.25);
        assert!((slow.max_steps_per_second - 1.0).abs() < f32::EPSILON);
        assert!((slow.accel_steps_per_second2 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn default_motion_scales_by_quarter() {
        let slow = MotionCfg::default().scaled(0.25, 0.25);
        assert!((slow.max_steps_per_second - 800.0).abs() < 1e-3);
        assert!((slow.accel_steps_per_second2 - 200.0).abs() < 1e-3);
        assert!((slow.open_turns - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn validity_rejects_non_positive() {
        assert!(MotionCfg::default().is_valid());
        let bad = MotionCfg {
            max_steps_per_second: 0.0,
            ..MotionCfg::default()
        };
        assert!(!bad.is_valid());
        let nan = MotionCfg {
            open_turns: f32::NAN,
            ..MotionCfg::default()
        };
        assert!(!nan.is_valid());
    }
}
