//! Hardware seams shared by the controller, the hardware backends and the CLI.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Boxed error type used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Step/direction driver for a single stepper axis.
pub trait StepperDriver {
    /// Emit one step pulse; `forward` selects the direction line level.
    fn step(&mut self, forward: bool) -> Result<(), BoxError>;
    /// Energise or release the driver outputs.
    fn set_enabled(&mut self, on: bool) -> Result<(), BoxError>;
}

/// A polled digital input with the active level already resolved.
pub trait DigitalInput {
    fn is_active(&mut self) -> Result<bool, BoxError>;
}

/// Request/response sensor on a serial line.
///
/// Sends a single command byte and returns the first complete reply line,
/// or `Ok(None)` when no terminated line arrived before `timeout`.
pub trait LineSensor {
    fn query(&mut self, command: u8, timeout: Duration) -> Result<Option<String>, BoxError>;
}

impl<T: StepperDriver + ?Sized> StepperDriver for Box<T> {
    fn step(&mut self, forward: bool) -> Result<(), BoxError> {
        (**self).step(forward)
    }

    fn set_enabled(&mut self, on: bool) -> Result<(), BoxError> {
        (**self).set_enabled(on)
    }
}

impl<T: DigitalInput + ?Sized> DigitalInput for Box<T> {
    fn is_active(&mut self) -> Result<bool, BoxError> {
        (**self).is_active()
    }
}

impl<T: LineSensor + ?Sized> LineSensor for Box<T> {
    fn query(&mut self, command: u8, timeout: Duration) -> Result<Option<String>, BoxError> {
        (**self).query(command, timeout)
    }
}
