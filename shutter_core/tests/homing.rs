mod common;

use common::{Mechanism, Probe, Rig, test_cfg};
use shutter_core::State;

// 1000 steps at 200 steps/turn and 25.4466 cm/turn
const DST_1000_STEPS: &str = "$DST:127.233";

#[test]
fn boot_reading_seeds_position_and_homes() {
    let mut rig = Rig::new(Mechanism::at(1000), Probe::with_distance(DST_1000_STEPS), test_cfg());

    rig.tick(100);
    assert_eq!(rig.ctrl.state(), State::HomingStart);
    assert!(rig.logged("Turns before close: 5.00"));

    rig.tick(100);
    assert_eq!(rig.ctrl.state(), State::HomingRun);
    assert!(rig.ctrl.motion_overridden());
    assert_eq!(rig.ctrl.axis().position_steps(), 1000);
    // boot reading is reused, no second query
    assert_eq!(rig.probe.distance_queries(), 1);
    assert!(rig.logged("Distance OK, steps=1000"));
    // reduced profile while homing from an estimate
    assert!((rig.ctrl.axis().motion().max_speed() - 1000.0).abs() < 1e-3);

    assert!(rig.run_until_state(State::Idle, 5_000));
    assert_eq!(rig.ctrl.axis().position_steps(), 0);
    assert_eq!(rig.mech.position.get(), 0);
    assert!(!rig.ctrl.motion_overridden());
    assert!((rig.ctrl.axis().motion().max_speed() - 2000.0).abs() < 1e-3);
}

#[test]
fn seeded_homing_ends_calibrated() {
    let mut rig = Rig::new(Mechanism::at(1000), Probe::with_distance(DST_1000_STEPS), test_cfg());
    rig.tick(100);
    assert!(rig.run_until_state(State::Idle, 5_000));
    // the final step lands on the switch and latches before Idle is reported
    assert!(rig.ctrl.axis().limit_engaged());
    assert!(rig.ctrl.status().since_calibration.is_some());
}

#[test]
fn missing_reading_falls_back_to_slow_homing() {
    let mut rig = Rig::new(Mechanism::at(600), Probe::default(), test_cfg());

    rig.tick(100);
    assert!(rig.logged("Distance invalid or no reply"));
    rig.tick(100);
    assert_eq!(rig.ctrl.state(), State::HomingRun);
    // boot failed, so homing start asks again
    assert_eq!(rig.probe.distance_queries(), 2);
    assert!(rig.logged("Distance invalid, slow homing"));
    let m = rig.ctrl.axis().motion();
    assert!((m.max_speed() - 500.0).abs() < 1e-3);
    assert!((m.acceleration() - 2000.0).abs() < 1e-3);
    assert_eq!(m.target(), -8000);

    assert!(rig.run_until_state(State::Idle, 10_000));
    assert_eq!(rig.ctrl.axis().position_steps(), 0);
    assert_eq!(rig.mech.position.get(), 0);
    assert!(rig.ctrl.axis().last_calibration().is_some());
    assert!((rig.ctrl.axis().motion().max_speed() - 2000.0).abs() < 1e-3);
}

#[test]
fn limit_hit_before_estimate_recalibrates() {
    // the probe overestimates: the switch closes with 600 steps still to go
    let mut rig = Rig::new(Mechanism::at(400), Probe::with_distance(DST_1000_STEPS), test_cfg());
    rig.tick(100);
    assert!(rig.run_until_state(State::Idle, 5_000));
    assert_eq!(rig.ctrl.axis().position_steps(), 0);
    assert!(!rig.ctrl.is_moving());
    assert_eq!(rig.mech.position.get(), 0);
    assert!(rig.ctrl.status().since_calibration.is_some());
}

#[test]
fn homing_timeout_faults_and_stop_rehomes() {
    let mech = Mechanism::at(600);
    mech.limit_works.set(false);
    let mut rig = Rig::new(mech, Probe::default(), test_cfg());

    rig.tick(100);
    assert!(rig.run_until(500, 40_000, |c| c.state() == shutter_core::State::Fault));
    assert!(rig.logged("[FSM] FAULT"));

    rig.ctrl.request_command(shutter_core::Command::Stop);
    rig.tick(100);
    assert_eq!(rig.ctrl.state(), State::HomingRun);

    let lines = rig.log_lines();
    let tail: Vec<&str> = lines.iter().rev().take(4).rev().map(String::as_str).collect();
    assert_eq!(
        tail,
        vec![
            "[FSM] FAULT",
            "[FSM] HOMING START",
            "[FSM] Distance invalid, slow homing",
            "[FSM] HOMING",
        ]
    );
}

#[test]
fn home_command_recovers_from_fault() {
    let mech = Mechanism::at(600);
    mech.limit_works.set(false);
    let mut rig = Rig::new(mech.clone(), Probe::default(), test_cfg());
    rig.tick(100);
    assert!(rig.run_until(500, 40_000, |c| c.state() == State::Fault));

    mech.limit_works.set(true);
    rig.ctrl.request_command(shutter_core::Command::Home);
    rig.tick(100);
    assert_eq!(rig.ctrl.state(), State::HomingRun);
    assert!(rig.run_until_state(State::Idle, 40_000));
}

#[test]
fn engaged_limit_at_start_is_already_home() {
    let mut rig = Rig::new(Mechanism::at(0), Probe::with_distance("$DST:50.0"), test_cfg());
    for _ in 0..3 {
        rig.tick(100);
    }
    assert_eq!(rig.ctrl.state(), State::Idle);
    assert!(rig.logged("already home"));
    assert_eq!(rig.probe.distance_queries(), 1);
    assert_eq!(rig.mech.steps.get(), 0);
    assert_eq!(rig.ctrl.axis().position_steps(), 0);
}

#[test]
fn stop_during_homing_restores_operator_profile() {
    let mut rig = Rig::new(Mechanism::at(5000), Probe::default(), test_cfg());
    rig.tick(100);
    rig.tick(100);
    assert!(rig.ctrl.motion_overridden());
    rig.run_until(100, 200, |_| false);

    rig.ctrl.request_command(shutter_core::Command::Stop);
    rig.tick(100);
    assert_eq!(rig.ctrl.state(), State::Stopping);
    assert!(!rig.ctrl.motion_overridden());
    assert!((rig.ctrl.axis().motion().max_speed() - 2000.0).abs() < 1e-3);
    assert!(rig.run_until_state(State::Idle, 2_000));
}

#[test]
fn stop_during_boot_does_not_skip_homing() {
    let mut rig = Rig::new(Mechanism::at(1000), Probe::with_distance(DST_1000_STEPS), test_cfg());
    rig.ctrl.request_command(shutter_core::Command::Stop);
    rig.tick(100);
    assert_eq!(rig.ctrl.state(), State::HomingStart);
    assert_eq!(rig.ctrl.pending(), None);
    assert!(!rig.logged("[FSM] STOPPING"));
    rig.tick(100);
    assert_eq!(rig.ctrl.state(), State::HomingRun);
    assert!(rig.run_until_state(State::Idle, 5_000));
    assert_eq!(rig.mech.position.get(), 0);
}
