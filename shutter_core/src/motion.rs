//! Acceleration-limited step scheduler for a single axis.
//!
//! `MotionIntegrator` owns position, target and signed speed. Each call to
//! [`MotionIntegrator::tick`] integrates the velocity profile over the time
//! elapsed since the previous active tick and emits at most one step, no matter
//! how late the caller is. It knows nothing about pins or device semantics.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::config::IntegratorCfg;
use crate::util::step_interval_us;

/// Below this speed (steps/s) the axis counts as stopped.
const REST_SPEED: f32 = 1e-3;

/// Direction of a single emitted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }

    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }

    fn from_sign(s: i64) -> Option<Self> {
        match s.cmp(&0) {
            Ordering::Greater => Some(Self::Forward),
            Ordering::Less => Some(Self::Reverse),
            Ordering::Equal => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionIntegrator {
    position: i64,
    target: i64,
    /// steps/s, sign is direction
    speed: f32,
    max_speed: f32,
    accel: f32,
    step_interval_us: u64,
    next_step: Option<Instant>,
    /// Time of the previous non-idle tick; `None` while at rest.
    last_update: Option<Instant>,
    cfg: IntegratorCfg,
}

impl MotionIntegrator {
    pub fn new(cfg: IntegratorCfg) -> Self {
        Self {
            position: 0,
            target: 0,
            speed: 0.0,
            max_speed: 1.0,
            accel: 1.0,
            step_interval_us: cfg.max_step_interval_us,
            next_step: None,
            last_update: None,
            cfg,
        }
    }

    /// Convenience constructor with limits applied.
    pub fn with_limits(cfg: IntegratorCfg, max_speed: f32, accel: f32) -> Self {
        let mut m = Self::new(cfg);
        m.set_velocity_limits(max_speed, accel);
        m
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn acceleration(&self) -> f32 {
        self.accel
    }

    /// Step period derived on the last active tick.
    pub fn step_interval_us(&self) -> u64 {
        self.step_interval_us
    }

    pub fn is_moving(&self) -> bool {
        self.target != self.position
    }

    /// Steps needed to come to rest from the current speed, rounded to nearest.
    pub fn steps_to_stop(&self) -> i64 {
        ((self.speed * self.speed) / (2.0 * self.accel)).round() as i64
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Set both limits; negatives are taken by magnitude and both floor at 1.0.
    /// The current speed is clamped to the new maximum immediately.
    pub fn set_velocity_limits(&mut self, max_speed: f32, accel: f32) {
        self.max_speed = sanitize_limit(max_speed);
        self.accel = sanitize_limit(accel);
        self.speed = self.speed.clamp(-self.max_speed, self.max_speed);
    }

    /// Retarget. Starting from rest the speed is kicked to the start speed toward the target.
    pub fn set_target(&mut self, target: i64) {
        self.target = target;
        if self.speed.abs() < REST_SPEED && target != self.position {
            let kick = self.cfg.min_start_sps.min(self.max_speed);
            self.speed = if target > self.position { kick } else { -kick };
        }
    }

    pub fn move_by(&mut self, delta: i64) {
        self.set_target(self.position.saturating_add(delta));
    }

    /// Overwrite the position counter without touching target or speed.
    pub fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    /// Retarget to the closest position reachable within the natural stopping
    /// distance. Never moves an already-closer target further out.
    pub fn stop(&mut self) {
        if self.speed.abs() < REST_SPEED {
            self.target = self.position;
            return;
        }
        let dir: i64 = if self.speed >= 0.0 { 1 } else { -1 };
        let stop_steps = self.steps_to_stop().max(1);
        let ahead = (self.target - self.position) * dir;
        if (0..=stop_steps).contains(&ahead) {
            return;
        }
        self.target = self.position + dir * stop_steps;
    }

    /// Zero the speed and drop the step schedule.
    pub fn emergency_stop(&mut self) {
        self.speed = 0.0;
        self.next_step = None;
    }

    // ── Integration ──────────────────────────────────────────────────────────

    /// Advance the profile to `now`. Returns the direction of the step to emit, if any.
    pub fn tick(&mut self, now: Instant) -> Option<Direction> {
        let remaining = (self.target - self.position).abs();

        if remaining == 0 && self.speed.abs() < REST_SPEED {
            self.speed = 0.0;
            self.next_step = None;
            self.last_update = None;
            return None;
        }

        let dt = self
            .last_update
            .map_or(Duration::ZERO, |prev| now.saturating_duration_since(prev))
            .min(self.cfg.max_dt)
            .as_secs_f32();
        self.last_update = Some(now);

        let desired = match self.target.cmp(&self.position) {
            Ordering::Greater => 1,
            Ordering::Less => -1,
            Ordering::Equal if self.speed >= 0.0 => 1,
            Ordering::Equal => -1,
        };

        let stopping = (self.speed * self.speed) / (2.0 * self.accel);
        if stopping >= remaining as f32 {
            let next = self.speed - self.speed.signum() * self.accel * dt;
            // braking ends at zero, it never reverses
            self.speed = if next * self.speed < 0.0 { 0.0 } else { next };
        } else {
            self.speed += desired as f32 * self.accel * dt;
        }
        self.speed = self.speed.clamp(-self.max_speed, self.max_speed);

        self.step_interval_us = step_interval_us(
            self.speed,
            self.cfg.min_start_sps,
            self.cfg.max_step_interval_us,
        );
        let period = Duration::from_micros(self.step_interval_us);
        let deadline = *self.next_step.get_or_insert(now + period);

        if now >= deadline
            && remaining != 0
            && let Some(dir) = Direction::from_sign(desired)
        {
            self.position += dir.sign();
            self.next_step = Some(now + period);
            return Some(dir);
        }
        None
    }
}

fn sanitize_limit(v: f32) -> f32 {
    if v.is_finite() { v.abs().max(1.0) } else { 1.0 }
}
