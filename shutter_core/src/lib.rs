#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core shutter control logic (hardware-agnostic).
//!
//! All hardware interactions go through the `shutter_traits` seams:
//! `StepperDriver`, `DigitalInput` and `LineSensor`.
//!
//! ## Architecture
//!
//! - **Motion**: acceleration-limited step scheduler, one step per tick at most (`motion`)
//! - **Axis**: limit-switch recalibration and button classification (`axis`)
//! - **Commands**: 4-deep FIFO with explicit overflow (`queue`)
//! - **Orchestration**: boot, homing, open/close/stop and fault handling (`orchestrator`)
//! - **Probe**: distance/temperature reply parsing (`sensor`)
//! - **Observability**: bounded event log and status snapshot (`event_log`, `status`)
//!
//! Positions are integer steps; speeds are `f32` steps per second.

pub mod axis;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod event_log;
pub mod hw_error;
pub mod mocks;
pub mod motion;
pub mod orchestrator;
pub mod queue;
pub mod sensor;
pub mod status;
pub mod util;

pub use axis::{AxisController, ButtonEvent};
pub use builder::{Controller, ControllerBuilder, build_controller};
pub use config::{
    ButtonCfg, ButtonPolicy, ControllerCfg, HomingCfg, IntegratorCfg, MechanicsCfg, MotionCfg,
    SensorCfg,
};
pub use error::{BuildError, ControllerError, Result};
pub use event_log::EventLog;
pub use motion::{Direction, MotionIntegrator};
pub use orchestrator::Orchestrator;
pub use queue::{Command, CommandQueue, QueueFull};
pub use status::{State, Status};
