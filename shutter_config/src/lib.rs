#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the shutter controller.
//!
//! - `Config` and its sections are deserialized from TOML.
//! - Every section except `[pins]` has defaults matching the stock mechanism.
//! - `Config::validate` rejects values the controller must never see
//!   (non-positive motion parameters, zero timeouts, inverted button thresholds).
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub step: u8,
    pub dir: u8,
    pub enable: Option<u8>,
    #[serde(default = "default_true")]
    pub enable_active_low: bool,
    pub limit: u8,
    #[serde(default = "default_true")]
    pub limit_active_low: bool,
    pub button: Option<u8>,
    #[serde(default = "default_true")]
    pub button_active_low: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Mechanics {
    pub full_steps_per_rev: u32,
    pub microstep_factor: u32,
    /// Linear travel of the counterweight per output turn, used to turn a
    /// distance reading into an initial position estimate.
    pub cm_per_turn: f32,
}

impl Default for Mechanics {
    fn default() -> Self {
        Self {
            full_steps_per_rev: 200,
            microstep_factor: 10,
            cm_per_turn: 25.4466,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Motion {
    pub open_turns: f32,
    pub max_steps_per_second: f32,
    pub accel_steps_per_second2: f32,
}

impl Default for Motion {
    fn default() -> Self {
        // 1.6 rev/s and 0.0002 rev/s^2 scaled by steps_per_rev^2 for the stock 2000-step drive
        Self {
            open_turns: 10.0,
            max_steps_per_second: 3200.0,
            accel_steps_per_second2: 800.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Homing {
    /// Relative travel (turns) of the blind homing move when no estimate is available.
    pub travel_turns: f32,
    pub timeout_ms: u64,
    pub speed_factor: f32,
    pub accel_factor: f32,
    /// Profile scale applied when homing from a sensor estimate.
    pub seeded_speed_factor: f32,
}

impl Default for Homing {
    fn default() -> Self {
        Self {
            travel_turns: 40.0,
            timeout_ms: 30_000,
            speed_factor: 0.25,
            accel_factor: 0.25,
            seeded_speed_factor: 0.5,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ButtonPolicy {
    /// Short press at rest opens from zero, closes from anywhere else.
    #[default]
    Position,
    /// Short press at rest reverses the last motion started.
    Toggle,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Button {
    pub debounce_ms: u64,
    pub long_press_ms: u64,
    pub policy: ButtonPolicy,
}

impl Default for Button {
    fn default() -> Self {
        Self {
            debounce_ms: 125,
            long_press_ms: 5_000,
            policy: ButtonPolicy::Position,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Sensor {
    /// Serial device of the distance/temperature probe; absent means no probe.
    pub port: Option<String>,
    pub baud: u32,
    pub timeout_ms: u64,
    pub temperature_poll_ms: u64,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115_200,
            timeout_ms: 2_000,
            temperature_poll_ms: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Integrator {
    pub min_start_sps: f32,
    pub max_step_interval_us: u64,
    pub max_dt_ms: u64,
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            min_start_sps: 2.0,
            max_step_interval_us: 50_000,
            max_dt_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// Byte budget of the in-memory event log shown to operators.
    pub event_log_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Runner {
    /// Sleep between iterations while the axis is at rest.
    pub idle_sleep_us: u64,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            idle_sleep_us: 1_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub mechanics: Mechanics,
    #[serde(default)]
    pub motion: Motion,
    #[serde(default)]
    pub homing: Homing,
    #[serde(default)]
    pub button: Button,
    #[serde(default)]
    pub sensor: Sensor,
    #[serde(default)]
    pub integrator: Integrator,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: Runner,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn positive_finite(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn unit_factor(v: f32) -> bool {
    v.is_finite() && v > 0.0 && v <= 1.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.step == self.pins.dir {
            eyre::bail!("pins.step and pins.dir must differ");
        }
        if self.pins.limit == self.pins.step || self.pins.limit == self.pins.dir {
            eyre::bail!("pins.limit must not share a motor output pin");
        }

        // Mechanics
        if self.mechanics.full_steps_per_rev == 0 {
            eyre::bail!("mechanics.full_steps_per_rev must be >= 1");
        }
        if self.mechanics.microstep_factor == 0 {
            eyre::bail!("mechanics.microstep_factor must be >= 1");
        }
        if !positive_finite(self.mechanics.cm_per_turn) {
            eyre::bail!("mechanics.cm_per_turn must be > 0");
        }

        // Motion
        if !positive_finite(self.motion.open_turns) {
            eyre::bail!("motion.open_turns must be > 0");
        }
        if !positive_finite(self.motion.max_steps_per_second) {
            eyre::bail!("motion.max_steps_per_second must be > 0");
        }
        if !positive_finite(self.motion.accel_steps_per_second2) {
            eyre::bail!("motion.accel_steps_per_second2 must be > 0");
        }

        // Homing
        if !positive_finite(self.homing.travel_turns) {
            eyre::bail!("homing.travel_turns must be > 0");
        }
        if self.homing.timeout_ms == 0 {
            eyre::bail!("homing.timeout_ms must be >= 1");
        }
        if !unit_factor(self.homing.speed_factor) {
            eyre::bail!("homing.speed_factor must be in (0.0, 1.0]");
        }
        if !unit_factor(self.homing.accel_factor) {
            eyre::bail!("homing.accel_factor must be in (0.0, 1.0]");
        }
        if !unit_factor(self.homing.seeded_speed_factor) {
            eyre::bail!("homing.seeded_speed_factor must be in (0.0, 1.0]");
        }

        // Button
        if self.button.debounce_ms == 0 {
            eyre::bail!("button.debounce_ms must be >= 1");
        }
        if self.button.long_press_ms <= self.button.debounce_ms {
            eyre::bail!("button.long_press_ms must exceed button.debounce_ms");
        }

        // Sensor
        if self.sensor.timeout_ms == 0 {
            eyre::bail!("sensor.timeout_ms must be >= 1");
        }
        if self.sensor.temperature_poll_ms == 0 {
            eyre::bail!("sensor.temperature_poll_ms must be >= 1");
        }
        if self.sensor.baud == 0 {
            eyre::bail!("sensor.baud must be > 0");
        }

        // Integrator
        if !positive_finite(self.integrator.min_start_sps) {
            eyre::bail!("integrator.min_start_sps must be > 0");
        }
        if self.integrator.max_step_interval_us == 0 {
            eyre::bail!("integrator.max_step_interval_us must be >= 1");
        }
        if self.integrator.max_dt_ms == 0 {
            eyre::bail!("integrator.max_dt_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }
        if self.logging.event_log_bytes == Some(0) {
            eyre::bail!("logging.event_log_bytes must be >= 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pins]
step = 13
dir = 12
limit = 5
"#;

    #[test]
    fn minimal_config_takes_stock_defaults() {
        let cfg = load_toml(MINIMAL).expect("parse");
        assert_eq!(cfg.mechanics.full_steps_per_rev * cfg.mechanics.microstep_factor, 2000);
        assert!((cfg.motion.max_steps_per_second - 3200.0).abs() < f32::EPSILON);
        assert_eq!(cfg.homing.timeout_ms, 30_000);
        assert_eq!(cfg.button.policy, ButtonPolicy::Position);
        assert!(cfg.pins.limit_active_low);
        assert!(cfg.sensor.port.is_none());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn toggle_policy_parses_lowercase() {
        let text = format!("{MINIMAL}\n[button]\npolicy = \"toggle\"\n");
        let cfg = load_toml(&text).expect("parse");
        assert_eq!(cfg.button.policy, ButtonPolicy::Toggle);
    }
}
