//! Top-level device state machine.
//!
//! The orchestrator owns the axis, the probe, the command queue and the logical
//! state. One call to [`Orchestrator::tick`] runs one control iteration:
//!
//! 1. poll the axis (limit latch, one integrator tick, button classification);
//! 2. translate a button event into a command request;
//! 3. dispatch the pending command against the current state;
//! 4. evaluate the state's exit condition;
//! 5. poll the temperature when the axis is at rest.
//!
//! Commands arrive through [`Orchestrator::request_command`]. Stop is always
//! taken immediately and flushes the queue; everything else fills the single
//! pending slot or waits in the 4-deep queue. A command that contradicts the
//! motion in progress brakes the axis and is re-queued to run once it is idle.

use std::sync::Arc;
use std::time::Instant;

use shutter_traits::{Clock, DigitalInput, LineSensor, StepperDriver};

use crate::axis::{AxisController, ButtonEvent};
use crate::config::{ButtonPolicy, ControllerCfg, HomingCfg, MechanicsCfg, MotionCfg, SensorCfg};
use crate::error::Result;
use crate::event_log::EventLog;
use crate::queue::{Command, CommandQueue};
use crate::sensor;
use crate::status::{State, Status};
use crate::util::{cm_to_steps, turns_to_steps};

pub struct Orchestrator<D, L, B, S> {
    axis: AxisController<D, L, B>,
    sensor: S,
    clock: Arc<dyn Clock + Send + Sync>,

    state: State,
    pending: Option<Command>,
    queue: CommandQueue,

    /// Operator profile; the axis runs a homing profile while `motion_overridden`.
    motion: MotionCfg,
    motion_overridden: bool,
    mechanics: MechanicsCfg,
    homing: HomingCfg,
    sensor_cfg: SensorCfg,
    button_policy: ButtonPolicy,

    boot_distance_cm: Option<f32>,
    homing_started: Option<Instant>,
    calibration_seen: Option<Instant>,

    cycles: u64,
    opened_since_last_close: bool,
    last_motion: Option<Command>,

    temperature_c: Option<f32>,
    last_temperature_poll: Instant,
    started: Instant,
    log: EventLog,
}

impl<D, L, B, S> std::fmt::Debug for Orchestrator<D, L, B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("queued", &self.queue.len())
            .field("cycles", &self.cycles)
            .field("axis", &self.axis)
            .finish()
    }
}

impl<D, L, B, S> Orchestrator<D, L, B, S>
where
    D: StepperDriver,
    L: DigitalInput,
    B: DigitalInput,
    S: LineSensor,
{
    pub fn new(
        axis: AxisController<D, L, B>,
        sensor: S,
        clock: Arc<dyn Clock + Send + Sync>,
        cfg: &ControllerCfg,
    ) -> Self {
        let started = clock.now();
        let mut log = EventLog::with_capacity(cfg.event_log_bytes);
        log.push("[FSM] Boot");
        tracing::info!("controller boot");
        Self {
            axis,
            sensor,
            clock,
            state: State::Boot,
            pending: None,
            queue: CommandQueue::new(),
            motion: cfg.motion,
            motion_overridden: false,
            mechanics: cfg.mechanics,
            homing: cfg.homing,
            sensor_cfg: cfg.sensor,
            button_policy: cfg.button.policy,
            boot_distance_cm: None,
            homing_started: None,
            calibration_seen: None,
            cycles: 0,
            opened_since_last_close: false,
            last_motion: None,
            temperature_c: None,
            last_temperature_poll: started,
            started,
            log,
        }
    }

    /// Run one control iteration.
    pub fn tick(&mut self) -> Result<()> {
        let now = self.clock.now();
        let event = self.axis.poll(now)?;
        self.handle_button(event);
        self.dispatch();
        self.advance(now);
        if !self.axis.is_moving() {
            self.poll_temperature(now);
        }
        Ok(())
    }

    // ── Command intake ───────────────────────────────────────────────────────

    /// Accept a command from any source.
    pub fn request_command(&mut self, cmd: Command) {
        if cmd == Command::Stop {
            self.pending = Some(Command::Stop);
            self.queue.clear();
            return;
        }
        if self.pending.is_none() {
            self.pending = Some(cmd);
        } else {
            self.enqueue(cmd);
        }
    }

    /// Accept a command from the remote surface, noting its origin.
    pub fn request_remote(&mut self, cmd: Command) {
        self.note(format!("[UI] {} requested", capitalize(cmd)));
        self.request_command(cmd);
    }

    fn enqueue(&mut self, cmd: Command) {
        if let Err(full) = self.queue.push(cmd) {
            tracing::warn!(dropped = %full.0, "command queue full");
            self.log.push("[WARN] Command queue full");
        }
    }

    fn handle_button(&mut self, event: ButtonEvent) {
        match event {
            ButtonEvent::ShortPress => {
                if self.axis.is_moving() {
                    self.note("[BUTTON] Stop requested".to_string());
                    self.request_command(Command::Stop);
                } else if self.state == State::Idle {
                    let cmd = self.short_press_command();
                    self.note(format!("[BUTTON] {} requested", capitalize(cmd)));
                    self.request_command(cmd);
                }
            }
            ButtonEvent::LongPress => {
                self.note("[BUTTON] Homing requested".to_string());
                self.request_command(Command::Home);
            }
            ButtonEvent::None => {}
        }
    }

    fn short_press_command(&self) -> Command {
        let by_position = if self.axis.position_steps() == 0 {
            Command::Open
        } else {
            Command::Close
        };
        match (self.button_policy, self.last_motion) {
            (ButtonPolicy::Toggle, Some(Command::Open)) => Command::Close,
            (ButtonPolicy::Toggle, Some(Command::Close)) => Command::Open,
            _ => by_position,
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    fn dispatch(&mut self) {
        if matches!(self.state, State::Idle | State::Fault) && self.pending.is_none() {
            self.pending = self.queue.pop();
        }
        let Some(cmd) = self.pending.take() else {
            return;
        };
        tracing::debug!(command = %cmd, state = %self.state, "dispatch");

        match (cmd, self.state) {
            // boot always proceeds to homing
            (_, State::Boot) => {
                tracing::debug!(command = %cmd, "command dropped during boot");
            }
            (Command::Stop, State::Fault) => self.enter(State::HomingStart),
            (Command::Stop, _) => {
                self.axis.stop();
                if self.motion_overridden {
                    self.restore_profile();
                }
                self.enter(State::Stopping);
            }
            (Command::Open, State::Idle) => self.start_motion(Command::Open),
            (Command::Close, State::Idle) => self.start_motion(Command::Close),
            (Command::Open, State::Closing) | (Command::Close, State::Opening) => {
                self.preempt(cmd);
            }
            (Command::Home, State::Idle | State::Fault) => self.enter(State::HomingStart),
            (Command::Home, State::Opening | State::Closing) => self.preempt(cmd),
            (cmd, state) => {
                tracing::debug!(command = %cmd, %state, "command dropped");
            }
        }
    }

    fn start_motion(&mut self, cmd: Command) {
        if cmd == Command::Open {
            self.axis.open();
            self.enter(State::Opening);
        } else {
            self.axis.close();
            self.enter(State::Closing);
        }
        self.last_motion = Some(cmd);
    }

    /// Brake the motion in progress and run `cmd` once the axis is idle.
    fn preempt(&mut self, cmd: Command) {
        self.axis.stop();
        self.enter(State::Stopping);
        self.enqueue(cmd);
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    fn advance(&mut self, now: Instant) {
        match self.state {
            State::Boot => {
                self.boot_distance_cm = self.read_distance();
                match self.boot_distance_cm {
                    Some(cm) => self.note(format!(
                        "[FSM] Turns before close: {:.2}",
                        cm / self.mechanics.cm_per_turn
                    )),
                    None => self.note("[FSM] Distance invalid or no reply".to_string()),
                }
                self.enter(State::HomingStart);
            }
            State::HomingStart => self.start_homing(now),
            State::HomingRun => {
                let homed = self.axis.last_calibration() != self.calibration_seen;
                let reached = !self.axis.is_moving() && self.axis.position_steps() == 0;
                let started = self.homing_started.unwrap_or(now);
                if homed || reached {
                    self.finish_homing();
                } else if now.saturating_duration_since(started) > self.homing.timeout {
                    tracing::warn!(elapsed_ms = self.clock.ms_since(started), "homing timed out");
                    self.enter(State::Fault);
                }
            }
            State::Opening => {
                if !self.axis.is_moving() {
                    self.opened_since_last_close = true;
                    self.enter(State::Idle);
                }
            }
            State::Closing => {
                if !self.axis.is_moving() {
                    if self.opened_since_last_close {
                        self.cycles += 1;
                        self.opened_since_last_close = false;
                        tracing::info!(cycles = self.cycles, "cycle completed");
                    }
                    self.enter(State::Idle);
                }
            }
            State::Stopping => {
                if !self.axis.is_moving() {
                    self.enter(State::Idle);
                }
            }
            State::Idle | State::Fault => {}
        }
    }

    fn start_homing(&mut self, now: Instant) {
        let boot_reading = self.boot_distance_cm.take();

        self.homing_started = Some(now);
        self.calibration_seen = self.axis.last_calibration();
        self.motion_overridden = false;

        if self.axis.limit_engaged() {
            self.axis.seed_position(0);
            self.note("[FSM] Limit engaged, already home".to_string());
        } else {
            let distance = boot_reading.or_else(|| self.read_distance());
            let estimated = distance.map_or(0, |cm| {
                cm_to_steps(cm, self.mechanics.cm_per_turn, self.mechanics.steps_per_rev)
            });

            if estimated > 0 {
                let seeded = self.motion.scaled(self.homing.seeded_speed_factor, 1.0);
                self.axis.apply_motion(&seeded);
                self.motion_overridden = true;
                self.axis.seed_position(estimated);
                self.axis.move_to_steps(0);
                self.note(format!("[FSM] Distance OK, steps={estimated}"));
            } else {
                let slow = self
                    .motion
                    .scaled(self.homing.speed_factor, self.homing.accel_factor);
                self.axis.apply_motion(&slow);
                self.motion_overridden = true;
                let travel = turns_to_steps(self.homing.travel_turns, self.mechanics.steps_per_rev);
                self.axis.move_relative(-travel);
                self.note("[FSM] Distance invalid, slow homing".to_string());
            }
        }
        self.enter(State::HomingRun);
    }

    fn finish_homing(&mut self) {
        self.restore_profile();
        self.calibration_seen = self.axis.last_calibration();
        self.enter(State::Idle);
    }

    fn restore_profile(&mut self) {
        self.axis.apply_motion(&self.motion);
        self.motion_overridden = false;
    }

    fn enter(&mut self, next: State) {
        tracing::info!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.log.push(format!("[FSM] {next}"));
    }

    // ── Sensor ───────────────────────────────────────────────────────────────

    fn read_distance(&mut self) -> Option<f32> {
        sensor::read_distance_cm(&mut self.sensor, self.sensor_cfg.timeout)
    }

    fn poll_temperature(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_temperature_poll)
            < self.sensor_cfg.temperature_poll
        {
            return;
        }
        if let Some(t) = sensor::read_temperature_c(&mut self.sensor, self.sensor_cfg.timeout) {
            tracing::debug!(temperature_c = t, "temperature");
            self.temperature_c = Some(t);
        }
        self.last_temperature_poll = now;
    }

    // ── Motion configuration ─────────────────────────────────────────────────

    /// Replace the operator profile. Rejected unless every field is positive.
    /// Applied to the axis at once unless a homing profile is active.
    pub fn apply_motion_config(&mut self, cfg: MotionCfg) -> bool {
        if !cfg.is_valid() {
            tracing::warn!(?cfg, "rejected motion config");
            return false;
        }
        self.motion = cfg;
        if !self.motion_overridden {
            self.axis.apply_motion(&cfg);
        }
        self.note(format!(
            "[CFG] turns={} speed={} accel={}",
            cfg.open_turns, cfg.max_steps_per_second, cfg.accel_steps_per_second2
        ));
        true
    }

    pub fn set_open_turns(&mut self, turns: f32) -> bool {
        self.apply_motion_config(MotionCfg {
            open_turns: turns,
            ..self.motion
        })
    }

    pub fn set_max_speed(&mut self, steps_per_second: f32) -> bool {
        self.apply_motion_config(MotionCfg {
            max_steps_per_second: steps_per_second,
            ..self.motion
        })
    }

    pub fn set_acceleration(&mut self, steps_per_second2: f32) -> bool {
        self.apply_motion_config(MotionCfg {
            accel_steps_per_second2: steps_per_second2,
            ..self.motion
        })
    }

    /// Halt the axis and release the driver.
    pub fn shutdown(&mut self) -> Result<()> {
        self.note("[FSM] Shutdown".to_string());
        self.axis.disable()
    }
}

impl<D, L, B, S> Orchestrator<D, L, B, S> {
    fn note(&mut self, line: String) {
        tracing::info!(state = %self.state, "{line}");
        self.log.push(line);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn pending(&self) -> Option<Command> {
        self.pending
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn motion_config(&self) -> MotionCfg {
        self.motion
    }

    /// Homing profile currently applied to the axis.
    pub fn motion_overridden(&self) -> bool {
        self.motion_overridden
    }

    pub fn temperature_c(&self) -> Option<f32> {
        self.temperature_c
    }

    pub fn axis(&self) -> &AxisController<D, L, B> {
        &self.axis
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn is_moving(&self) -> bool {
        self.axis.is_moving()
    }

    pub fn status(&self) -> Status {
        let now = self.clock.now();
        Status {
            state: self.state,
            temperature_c: self.temperature_c,
            since_calibration: self
                .axis
                .last_calibration()
                .map(|t| now.saturating_duration_since(t)),
            position_turns: self.axis.position_turns(),
            cycles: self.cycles,
            motion: self.motion,
            uptime: now.saturating_duration_since(self.started),
            pending: self.pending,
            queued: self.queue.len(),
            log_version: self.log.version(),
        }
    }
}

fn capitalize(cmd: Command) -> &'static str {
    match cmd {
        Command::Open => "Open",
        Command::Close => "Close",
        Command::Stop => "Stop",
        Command::Home => "Homing",
    }
}
