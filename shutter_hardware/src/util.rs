use std::time::{Duration, Instant};

use crate::error::Result;

/// Longest reply line kept; an overlong line keeps its last `MAX_LINE_LEN` bytes.
pub const MAX_LINE_LEN: usize = 64;

/// Collect one reply line from `read_byte`, or `Ok(None)` once `timeout` expires.
///
/// `read_byte` returns `Ok(None)` when nothing is waiting; the loop then sleeps
/// for `poll_interval`. CR or LF ends a non-empty line, leading terminators are
/// skipped and bytes outside printable ASCII are discarded.
pub fn read_line_with_timeout(
    mut read_byte: impl FnMut() -> Result<Option<u8>>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Option<String>> {
    let deadline = Instant::now() + timeout;
    let mut line = String::new();
    loop {
        match read_byte()? {
            Some(b'\r' | b'\n') if !line.is_empty() => return Ok(Some(line)),
            Some(b) => {
                if (0x20..0x7f).contains(&b) {
                    // noise ahead of the reply tag scrolls out
                    if line.len() == MAX_LINE_LEN {
                        line.remove(0);
                    }
                    line.push(char::from(b));
                }
                // bounded by the deadline even while bytes keep arriving
                if Instant::now() >= deadline {
                    return Ok(None);
                }
            }
            None => {
                if Instant::now() >= deadline {
                    if !line.is_empty() {
                        tracing::trace!(partial = %line, "reply line not terminated before timeout");
                    }
                    return Ok(None);
                }
                std::thread::sleep(poll_interval);
            }
        }
    }
}

/// Output level for a driver enable pin: `on` energises the coils.
pub fn enable_pin_high(on: bool, active_low: bool) -> bool {
    on != active_low
}

/// Busy-wait for pulse-width scale delays where `thread::sleep` is too coarse.
pub fn spin_for(d: Duration) {
    let end = Instant::now() + d;
    while Instant::now() < end {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_polarity_follows_active_low() {
        // active-low driver: released is high, energised is low
        assert!(enable_pin_high(false, true));
        assert!(!enable_pin_high(true, true));
        assert!(!enable_pin_high(false, false));
        assert!(enable_pin_high(true, false));
    }
}
