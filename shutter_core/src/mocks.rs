//! No-op collaborators for rigs without a button or a probe.

use std::time::Duration;

use shutter_traits::{BoxError, DigitalInput, LineSensor};

/// A button that is never pressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoButton;

impl DigitalInput for NoButton {
    fn is_active(&mut self) -> Result<bool, BoxError> {
        Ok(false)
    }
}

/// A probe that never answers; homing falls back to the slow blind move.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensor;

impl LineSensor for NoSensor {
    fn query(&mut self, _command: u8, _timeout: Duration) -> Result<Option<String>, BoxError> {
        Ok(None)
    }
}
