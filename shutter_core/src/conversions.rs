//! `From` implementations bridging `shutter_config` types to runtime types.

use std::time::Duration;

use crate::config::{
    ButtonCfg, ButtonPolicy, ControllerCfg, HomingCfg, IntegratorCfg, MechanicsCfg, MotionCfg,
    SensorCfg,
};
use crate::event_log::DEFAULT_EVENT_LOG_BYTES;

// ── Motion ───────────────────────────────────────────────────────────────────

impl From<&shutter_config::Motion> for MotionCfg {
    fn from(c: &shutter_config::Motion) -> Self {
        Self {
            open_turns: c.open_turns,
            max_steps_per_second: c.max_steps_per_second,
            accel_steps_per_second2: c.accel_steps_per_second2,
        }
    }
}

// ── Mechanics ────────────────────────────────────────────────────────────────

impl From<&shutter_config::Mechanics> for MechanicsCfg {
    fn from(c: &shutter_config::Mechanics) -> Self {
        Self {
            steps_per_rev: c.full_steps_per_rev.saturating_mul(c.microstep_factor),
            cm_per_turn: c.cm_per_turn,
        }
    }
}

// ── Homing ───────────────────────────────────────────────────────────────────

impl From<&shutter_config::Homing> for HomingCfg {
    fn from(c: &shutter_config::Homing) -> Self {
        Self {
            travel_turns: c.travel_turns,
            timeout: Duration::from_millis(c.timeout_ms),
            speed_factor: c.speed_factor,
            accel_factor: c.accel_factor,
            seeded_speed_factor: c.seeded_speed_factor,
        }
    }
}

// ── Button ───────────────────────────────────────────────────────────────────

impl From<shutter_config::ButtonPolicy> for ButtonPolicy {
    fn from(p: shutter_config::ButtonPolicy) -> Self {
        match p {
            shutter_config::ButtonPolicy::Position => Self::Position,
            shutter_config::ButtonPolicy::Toggle => Self::Toggle,
        }
    }
}

impl From<&shutter_config::Button> for ButtonCfg {
    fn from(c: &shutter_config::Button) -> Self {
        Self {
            debounce: Duration::from_millis(c.debounce_ms),
            long_press: Duration::from_millis(c.long_press_ms),
            policy: c.policy.into(),
        }
    }
}

// ── Sensor / integrator ──────────────────────────────────────────────────────

impl From<&shutter_config::Sensor> for SensorCfg {
    fn from(c: &shutter_config::Sensor) -> Self {
        Self {
            timeout: Duration::from_millis(c.timeout_ms),
            temperature_poll: Duration::from_millis(c.temperature_poll_ms),
        }
    }
}

impl From<&shutter_config::Integrator> for IntegratorCfg {
    fn from(c: &shutter_config::Integrator) -> Self {
        Self {
            min_start_sps: c.min_start_sps,
            max_step_interval_us: c.max_step_interval_us,
            max_dt: Duration::from_millis(c.max_dt_ms),
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&shutter_config::Config> for ControllerCfg {
    fn from(c: &shutter_config::Config) -> Self {
        Self {
            motion: (&c.motion).into(),
            mechanics: (&c.mechanics).into(),
            homing: (&c.homing).into(),
            button: (&c.button).into(),
            sensor: (&c.sensor).into(),
            integrator: (&c.integrator).into(),
            event_log_bytes: c.logging.event_log_bytes.unwrap_or(DEFAULT_EVENT_LOG_BYTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_toml_maps_to_stock_runtime_config() {
        let cfg = shutter_config::load_toml("[pins]\nstep = 13\ndir = 12\nlimit = 5\n")
            .expect("parse");
        let rt = ControllerCfg::from(&cfg);
        assert_eq!(rt.mechanics.steps_per_rev, 2000);
        assert_eq!(rt.homing.timeout, Duration::from_secs(30));
        assert_eq!(rt.button.long_press, Duration::from_secs(5));
        assert_eq!(rt.integrator.max_dt, Duration::from_millis(50));
        assert_eq!(rt.event_log_bytes, 2000);
        assert_eq!(rt.motion, MotionCfg::default());
    }

    #[test]
    fn toggle_policy_carries_over() {
        let cfg = shutter_config::load_toml(
            "[pins]\nstep = 13\ndir = 12\nlimit = 5\n[button]\npolicy = \"toggle\"\n",
        )
        .expect("parse");
        assert_eq!(ButtonCfg::from(&cfg.button).policy, ButtonPolicy::Toggle);
    }
}
