//! Orchestrator state and the read-only status snapshot.

use std::fmt;
use std::time::Duration;

use crate::config::MotionCfg;
use crate::queue::Command;

/// Logical state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Boot,
    HomingStart,
    HomingRun,
    Idle,
    Opening,
    Closing,
    Stopping,
    /// Homing timed out; only Stop or Home leave this state.
    Fault,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boot => "BOOT",
            Self::HomingStart => "HOMING START",
            Self::HomingRun => "HOMING",
            Self::Idle => "IDLE",
            Self::Opening => "OPENING",
            Self::Closing => "CLOSING",
            Self::Stopping => "STOPPING",
            Self::Fault => "FAULT",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of everything an operator surface shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub state: State,
    /// Last successful temperature reading.
    pub temperature_c: Option<f32>,
    /// Time since the limit switch last recalibrated the axis.
    pub since_calibration: Option<Duration>,
    pub position_turns: f32,
    pub cycles: u64,
    pub motion: MotionCfg,
    pub uptime: Duration,
    pub pending: Option<Command>,
    pub queued: usize,
    /// Event log version at snapshot time.
    pub log_version: u64,
}
