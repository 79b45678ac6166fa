use assert_cmd::Command;
use std::fs;
use tempfile::tempdir;

const CFG: &str = r#"
[pins]
step = 13
dir = 19
limit = 26

[mechanics]
microstep_factor = 1

[motion]
open_turns = 2.0
max_steps_per_second = 4000.0
accel_steps_per_second2 = 40000.0

[runner]
idle_sleep_us = 200
"#;

fn stdout_json(out: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(out);
    let last = text.lines().last().unwrap_or_default();
    serde_json::from_str(last).unwrap_or_else(|e| panic!("not json: {last:?}: {e}"))
}

#[test]
fn status_json_reports_homed_state_and_health() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, CFG).unwrap();
    let out = Command::cargo_bin("shutter")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--json")
        .args(["status", "--sim-start-turns", "1.5"])
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v = stdout_json(&out.stdout);
    assert_eq!(v["state"], "IDLE");
    assert_eq!(v["position_turns"], 0.0);
    assert_eq!(v["cycles"], 0);
    assert_eq!(v["motion"]["open_turns"], 2.0);
    assert!(v["since_calibration_ms"].is_u64());
    assert!(v["health"].is_object());
}

#[test]
fn errors_are_json_in_json_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[pins]\nstep = 13\ndir = 13\nlimit = 26\n").unwrap();
    let out = Command::cargo_bin("shutter")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    let line = err
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or_else(|| panic!("no json error in {err}"));
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "Error");
    assert!(v["message"].as_str().unwrap().contains("pins.step and pins.dir must differ"));
}

#[test]
fn json_logs_go_to_stderr_and_file() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("shutter.log");
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        format!("{CFG}\n[logging]\nfile = \"{}\"\n", log.display()),
    )
    .unwrap();
    let out = Command::cargo_bin("shutter")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .args(["--json", "--log-level", "info", "self-check"])
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(out.status.success());
    let v = stdout_json(&out.stdout);
    assert_eq!(v["ok"], true);
    assert_eq!(v["backend"], "sim");
    assert_eq!(v["steps_per_rev"], 200);
    // every stderr line is a JSON log record
    for line in String::from_utf8_lossy(&out.stderr).lines() {
        serde_json::from_str::<serde_json::Value>(line).unwrap();
    }
    assert!(log.exists());
}
