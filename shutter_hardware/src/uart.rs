//! Probe on a UART: one command byte out, one CR/LF terminated line back.

use std::path::Path;
use std::time::Duration;

use rppal::uart::{Parity, Queue, Uart};
use shutter_traits::{BoxError, LineSensor};

use crate::error::{HwError, Result};
use crate::util::read_line_with_timeout;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct UartSensor {
    uart: Uart,
}

impl UartSensor {
    /// Open `path` at `baud`, 8N1, with non-blocking reads.
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        let mut uart = Uart::with_path(path.as_ref(), baud, Parity::None, 8, 1)?;
        uart.set_read_mode(0, Duration::ZERO)?;
        tracing::debug!(path = %path.as_ref().display(), baud, "uart sensor open");
        Ok(Self { uart })
    }
}

impl LineSensor for UartSensor {
    fn query(
        &mut self,
        command: u8,
        timeout: Duration,
    ) -> std::result::Result<Option<String>, BoxError> {
        // stale bytes from an earlier late reply would be read as this answer
        self.uart.flush(Queue::Input).map_err(HwError::from)?;
        self.uart.write(&[command]).map_err(HwError::from)?;
        let uart = &mut self.uart;
        let line = read_line_with_timeout(
            || {
                let mut b = [0u8; 1];
                Ok((uart.read(&mut b)? == 1).then_some(b[0]))
            },
            timeout,
            POLL_INTERVAL,
        )?;
        tracing::trace!(command = %char::from(command), ?line, "uart reply");
        Ok(line)
    }
}
