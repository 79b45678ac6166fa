//! Distance/temperature probe on a request/response serial line.
//!
//! One command byte is sent, one reply line comes back. Replies look like
//! `$DST:123.4` or `$TMP:21.5`, but the tag is optional and anything before the
//! first numeric character is ignored.

use std::time::Duration;

use shutter_traits::LineSensor;

pub const DISTANCE_COMMAND: u8 = b'D';
pub const DISTANCE_TAG: &str = "$DST:";
pub const TEMPERATURE_COMMAND: u8 = b'T';
pub const TEMPERATURE_TAG: &str = "$TMP:";

/// Extract the value from a reply line.
///
/// Takes the text after `tag` when present (the whole line otherwise), skips to
/// the first of `0-9 - .` and parses the longest numeric prefix.
pub fn parse_reply(line: &str, tag: &str) -> Option<f32> {
    let body = match line.find(tag) {
        Some(idx) if !tag.is_empty() => &line[idx + tag.len()..],
        _ => line,
    };
    let start = body.find(|c: char| c.is_ascii_digit() || c == '-' || c == '.')?;
    let rest = &body[start..];

    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in rest.char_indices() {
        let ok = match c {
            '0'..='9' => true,
            '-' => i == 0,
            '.' if !seen_dot => {
                seen_dot = true;
                true
            }
            _ => false,
        };
        if !ok {
            break;
        }
        end = i + c.len_utf8();
    }
    rest[..end].parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Query `command` and parse the reply. Transport errors, timeouts and
/// unparseable replies all yield `None`.
pub fn read_value<S: LineSensor + ?Sized>(
    sensor: &mut S,
    command: u8,
    tag: &str,
    timeout: Duration,
) -> Option<f32> {
    match sensor.query(command, timeout) {
        Ok(Some(line)) => {
            let value = parse_reply(&line, tag);
            if value.is_none() {
                tracing::warn!(reply = %line, command = %char::from(command), "unparseable sensor reply");
            }
            value
        }
        Ok(None) => {
            tracing::warn!(command = %char::from(command), timeout_ms = timeout.as_millis() as u64, "sensor did not reply");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, command = %char::from(command), "sensor query failed");
            None
        }
    }
}

pub fn read_distance_cm<S: LineSensor + ?Sized>(sensor: &mut S, timeout: Duration) -> Option<f32> {
    read_value(sensor, DISTANCE_COMMAND, DISTANCE_TAG, timeout)
}

pub fn read_temperature_c<S: LineSensor + ?Sized>(
    sensor: &mut S,
    timeout: Duration,
) -> Option<f32> {
    read_value(sensor, TEMPERATURE_COMMAND, TEMPERATURE_TAG, timeout)
}
