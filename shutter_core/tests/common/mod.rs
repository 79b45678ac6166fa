//! Simulated rig shared by the integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::error::Error;
use std::rc::Rc;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{Duration, Instant};

use shutter_core::{
    ControllerCfg, HomingCfg, MechanicsCfg, MotionCfg, Orchestrator, State, build_controller,
};
use shutter_traits::{Clock, DigitalInput, LineSensor, StepperDriver};

type BoxError = Box<dyn Error + Send + Sync>;

// Deterministic test clock, microsecond resolution
#[derive(Clone)]
pub struct TestClock {
    origin: Instant,
    us: Arc<AtomicU64>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            us: Arc::new(AtomicU64::new(0)),
        }
    }
    pub fn advance_us(&self, us: u64) {
        self.us.fetch_add(us, Ordering::Relaxed);
    }
    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1000);
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_micros(self.us.load(Ordering::Relaxed))
    }
    fn sleep(&self, d: Duration) {
        self.advance_us(d.as_micros() as u64);
    }
}

/// Physical side of the mechanism.
#[derive(Clone, Default)]
pub struct Mechanism {
    /// Actual motor position in steps; the limit switch sits at 0.
    pub position: Rc<Cell<i64>>,
    pub steps: Rc<Cell<u64>>,
    pub enabled: Rc<Cell<bool>>,
    /// When false the switch never closes (broken wiring).
    pub limit_works: Rc<Cell<bool>>,
    pub button: Rc<Cell<bool>>,
}

impl Mechanism {
    pub fn at(position: i64) -> Self {
        let m = Self::default();
        m.position.set(position);
        m.limit_works.set(true);
        m
    }
}

pub struct SimDriver(Mechanism);

impl StepperDriver for SimDriver {
    fn step(&mut self, forward: bool) -> Result<(), BoxError> {
        let p = &self.0.position;
        p.set(p.get() + if forward { 1 } else { -1 });
        self.0.steps.set(self.0.steps.get() + 1);
        Ok(())
    }
    fn set_enabled(&mut self, on: bool) -> Result<(), BoxError> {
        self.0.enabled.set(on);
        Ok(())
    }
}

pub struct SimLimit(Mechanism);

impl DigitalInput for SimLimit {
    fn is_active(&mut self) -> Result<bool, BoxError> {
        Ok(self.0.limit_works.get() && self.0.position.get() <= 0)
    }
}

pub struct SimButton(Mechanism);

impl DigitalInput for SimButton {
    fn is_active(&mut self) -> Result<bool, BoxError> {
        Ok(self.0.button.get())
    }
}

/// Probe answering from scripted queues; an empty queue behaves like a timeout.
#[derive(Clone, Default)]
pub struct Probe {
    pub distance: Rc<RefCell<VecDeque<String>>>,
    pub temperature: Rc<RefCell<VecDeque<String>>>,
    pub calls: Rc<RefCell<Vec<u8>>>,
}

impl Probe {
    pub fn with_distance(line: &str) -> Self {
        let p = Self::default();
        p.distance.borrow_mut().push_back(line.to_string());
        p
    }
    pub fn distance_queries(&self) -> usize {
        self.calls.borrow().iter().filter(|c| **c == b'D').count()
    }
}

impl LineSensor for Probe {
    fn query(&mut self, command: u8, _timeout: Duration) -> Result<Option<String>, BoxError> {
        self.calls.borrow_mut().push(command);
        let queue = match command {
            b'D' => &self.distance,
            b'T' => &self.temperature,
            _ => return Ok(None),
        };
        Ok(queue.borrow_mut().pop_front())
    }
}

pub type SimController = Orchestrator<SimDriver, SimLimit, SimButton, Probe>;

/// Small, quick mechanism: 200 steps per turn, one turn to open.
pub fn test_cfg() -> ControllerCfg {
    ControllerCfg {
        motion: MotionCfg {
            open_turns: 1.0,
            max_steps_per_second: 2000.0,
            accel_steps_per_second2: 8000.0,
        },
        mechanics: MechanicsCfg {
            steps_per_rev: 200,
            cm_per_turn: 25.4466,
        },
        homing: HomingCfg {
            travel_turns: 40.0,
            ..HomingCfg::default()
        },
        event_log_bytes: 16_000,
        ..ControllerCfg::default()
    }
}

pub struct Rig {
    pub ctrl: SimController,
    pub clock: TestClock,
    pub mech: Mechanism,
    pub probe: Probe,
}

impl Rig {
    pub fn new(mech: Mechanism, probe: Probe, cfg: ControllerCfg) -> Self {
        let clock = TestClock::new();
        let ctrl = build_controller(
            SimDriver(mech.clone()),
            SimLimit(mech.clone()),
            SimButton(mech.clone()),
            probe.clone(),
            cfg,
            Some(Box::new(clock.clone())),
        )
        .expect("build controller");
        Self {
            ctrl,
            clock,
            mech,
            probe,
        }
    }

    /// One control iteration followed by `step_us` of simulated time.
    pub fn tick(&mut self, step_us: u64) {
        self.ctrl.tick().expect("tick");
        self.clock.advance_us(step_us);
    }

    /// Tick every `step_us` until `done` holds or `max_ms` of simulated time elapse.
    pub fn run_until(
        &mut self,
        step_us: u64,
        max_ms: u64,
        mut done: impl FnMut(&SimController) -> bool,
    ) -> bool {
        let mut elapsed = 0u64;
        while elapsed <= max_ms * 1000 {
            if done(&self.ctrl) {
                return true;
            }
            self.tick(step_us);
            elapsed += step_us;
        }
        done(&self.ctrl)
    }

    pub fn run_until_state(&mut self, state: State, max_ms: u64) -> bool {
        self.run_until(100, max_ms, |c| c.state() == state)
    }

    /// Boot and home to Idle.
    pub fn homed(mech: Mechanism, probe: Probe, cfg: ControllerCfg) -> Self {
        let mut rig = Self::new(mech, probe, cfg);
        rig.tick(100);
        assert!(rig.run_until_state(State::Idle, 40_000), "homing did not finish");
        rig
    }

    /// Hold the button for `held_ms`, ticking every millisecond.
    pub fn press_button(&mut self, held_ms: u64) {
        self.mech.button.set(true);
        for _ in 0..held_ms {
            self.tick(1000);
        }
        self.mech.button.set(false);
        self.tick(1000);
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.ctrl.event_log().lines().map(str::to_string).collect()
    }

    pub fn logged(&self, needle: &str) -> bool {
        self.ctrl.event_log().lines().any(|l| l.contains(needle))
    }
}
