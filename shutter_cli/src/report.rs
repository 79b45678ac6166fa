//! Status rendering for the terminal and for `--json`.

use serde_json::{Value, json};
use shutter_core::Status;

use crate::platform::Health;

pub fn status_line(s: &Status) -> String {
    let temp = s
        .temperature_c
        .map_or_else(|| "--".to_string(), |t| format!("{t:.1}C"));
    let cal = s
        .since_calibration
        .map_or_else(|| "never".to_string(), |d| format!("{}s ago", d.as_secs()));
    format!(
        "state={} pos={:.2}turns cycles={} temp={} calibrated={} open={:.2}turns speed={:.0}sps accel={:.0}sps2 uptime={}s queued={}",
        s.state,
        s.position_turns,
        s.cycles,
        temp,
        cal,
        s.motion.open_turns,
        s.motion.max_steps_per_second,
        s.motion.accel_steps_per_second2,
        s.uptime.as_secs(),
        s.queued,
    )
}

pub fn status_json(s: &Status, health: &Health) -> Value {
    json!({
        "state": s.state.as_str(),
        "position_turns": s.position_turns,
        "cycles": s.cycles,
        "temperature_c": s.temperature_c,
        "since_calibration_ms": s.since_calibration.map(|d| d.as_millis() as u64),
        "motion": {
            "open_turns": s.motion.open_turns,
            "max_steps_per_second": s.motion.max_steps_per_second,
            "accel_steps_per_second2": s.motion.accel_steps_per_second2,
        },
        "uptime_ms": s.uptime.as_millis() as u64,
        "pending": s.pending.map(|c| c.to_string()),
        "queued": s.queued,
        "log_version": s.log_version,
        "health": {
            "mem_available_kb": health.mem_available_kb,
            "cpu_mhz": health.cpu_mhz,
            "device_id": health.device_id,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shutter_core::{Command, MotionCfg, State};
    use std::time::Duration;

    fn sample() -> Status {
        Status {
            state: State::Idle,
            temperature_c: Some(21.5),
            since_calibration: Some(Duration::from_secs(42)),
            position_turns: 10.0,
            cycles: 3,
            motion: MotionCfg::default(),
            uptime: Duration::from_millis(90_500),
            pending: Some(Command::Close),
            queued: 1,
            log_version: 17,
        }
    }

    #[test]
    fn line_has_the_operator_fields() {
        let line = status_line(&sample());
        assert!(line.starts_with("state=IDLE pos=10.00turns cycles=3 temp=21.5C"), "{line}");
        assert!(line.contains("calibrated=42s ago"));
        assert!(line.contains("uptime=90s"));
    }

    #[test]
    fn json_shape() {
        let v = status_json(&sample(), &Health::default());
        assert_eq!(v["state"], "IDLE");
        assert_eq!(v["cycles"], 3);
        assert_eq!(v["pending"], "close");
        assert_eq!(v["since_calibration_ms"], 42_000);
        assert!(v["health"]["device_id"].is_null());
    }
}
