//! Hardware assembly and the control loop behind `run` and `status`.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use eyre::{Result, WrapErr};
use shutter_config::Config;
use shutter_core::util::turns_to_steps;
use shutter_core::{Command, Controller, ControllerCfg, State, Status};
use shutter_hardware::SimMechanism;

use crate::console::RemoteCommand;
use crate::platform::read_health;
use crate::report::{status_json, status_line};

// ── Assembly ─────────────────────────────────────────────────────────────────

/// Controller wired to an in-process mechanism resting `start_turns` above the
/// closed stop (half the open travel when unset).
pub fn sim_controller(
    cfg: &Config,
    start_turns: Option<f32>,
) -> Result<(Controller, SimMechanism)> {
    let core = ControllerCfg::from(cfg);
    let spr = core.mechanics.steps_per_rev;
    let start = start_turns.unwrap_or(core.motion.open_turns / 2.0);
    let mech = SimMechanism::new(turns_to_steps(start, spr), spr, core.mechanics.cm_per_turn);
    let ctl = Controller::builder()
        .with_driver(mech.stepper())
        .with_limit(mech.limit())
        .with_button(mech.button())
        .with_sensor(mech.probe())
        .with_config(core)
        .build()
        .wrap_err("building simulated controller")?;
    tracing::info!(start_turns = start, steps_per_rev = spr, "simulated mechanism ready");
    Ok((ctl, mech))
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn hardware_controller(cfg: &Config) -> Result<Controller> {
    use shutter_hardware::gpio::{GpioInput, GpioStepper};
    use shutter_hardware::uart::UartSensor;

    let p = &cfg.pins;
    let driver = GpioStepper::new(p.step, p.dir, p.enable, p.enable_active_low)
        .wrap_err("open stepper pins")?;
    let limit = GpioInput::new(p.limit, p.limit_active_low).wrap_err("open limit switch pin")?;
    let mut builder = Controller::builder()
        .with_driver(driver)
        .with_limit(limit)
        .with_config(ControllerCfg::from(cfg));
    if let Some(pin) = p.button {
        let button = GpioInput::new(pin, p.button_active_low).wrap_err("open button pin")?;
        builder = builder.with_button(button);
    }
    if let Some(port) = cfg.sensor.port.as_deref() {
        match UartSensor::open(port, cfg.sensor.baud) {
            Ok(s) => builder = builder.with_sensor(s),
            // homing falls back to the slow blind move without a probe
            Err(e) => tracing::warn!(error = %e, port, "sensor unavailable"),
        }
    }
    builder.build().wrap_err("building controller")
}

// ── Console commands ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn print_status(ctl: &Controller, json: bool, out: &mut impl Write) -> Result<()> {
    let s = ctl.status();
    if json {
        writeln!(out, "{}", status_json(&s, &read_health()))?;
    } else {
        writeln!(out, "{}", status_line(&s))?;
    }
    Ok(())
}

/// Apply one console command to the controller.
pub fn apply(
    ctl: &mut Controller,
    cmd: RemoteCommand,
    json: bool,
    out: &mut impl Write,
) -> Result<Flow> {
    let accepted = match cmd {
        RemoteCommand::Open => {
            ctl.request_remote(Command::Open);
            true
        }
        RemoteCommand::Close => {
            ctl.request_remote(Command::Close);
            true
        }
        RemoteCommand::Stop => {
            ctl.request_remote(Command::Stop);
            true
        }
        RemoteCommand::Home => {
            ctl.request_remote(Command::Home);
            true
        }
        RemoteCommand::Turns(t) => ctl.set_open_turns(t),
        RemoteCommand::Speed(v) => ctl.set_max_speed(v),
        RemoteCommand::Accel(a) => ctl.set_acceleration(a),
        RemoteCommand::Status => {
            print_status(ctl, json, out)?;
            true
        }
        RemoteCommand::Log => {
            write!(out, "{}", ctl.event_log().render())?;
            true
        }
        RemoteCommand::Quit => return Ok(Flow::Quit),
    };
    if !accepted {
        tracing::warn!(?cmd, "value rejected");
        writeln!(out, "rejected: {cmd:?}")?;
    }
    Ok(Flow::Continue)
}

// ── Loops ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub duration: Option<Duration>,
    pub idle_sleep: Duration,
    pub json: bool,
}

fn pace(ctl: &Controller, idle_sleep: Duration) {
    if ctl.is_moving() {
        std::thread::yield_now();
    } else {
        std::thread::sleep(idle_sleep);
    }
}

/// Tick until `quit`, Ctrl-C or the duration elapses, then release the driver.
/// The driver is released on the error path too.
pub fn run_loop(
    ctl: &mut Controller,
    commands: &Receiver<RemoteCommand>,
    shutdown: &AtomicBool,
    opts: &RunOptions,
    out: &mut impl Write,
) -> Result<Status> {
    let outcome = drive(ctl, commands, shutdown, opts, out);
    let released = ctl.shutdown().wrap_err("releasing stepper driver");
    match outcome {
        Ok(()) => {
            released?;
            Ok(ctl.status())
        }
        Err(e) => {
            if let Err(r) = released {
                tracing::warn!(error = %r, "driver release failed after loop error");
            }
            Err(e.wrap_err("control loop stopped"))
        }
    }
}

fn drive(
    ctl: &mut Controller,
    commands: &Receiver<RemoteCommand>,
    shutdown: &AtomicBool,
    opts: &RunOptions,
    out: &mut impl Write,
) -> Result<()> {
    let deadline = opts.duration.map(|d| Instant::now() + d);
    let mut console_open = true;
    'run: loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        while console_open {
            match commands.try_recv() {
                Ok(cmd) => {
                    if apply(ctl, cmd, opts.json, out)? == Flow::Quit {
                        break 'run;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => console_open = false,
            }
        }
        ctl.tick()?;
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        pace(ctl, opts.idle_sleep);
    }
    Ok(())
}

/// Tick until homing settles in Idle or Fault. The driver stays enabled.
pub fn home(ctl: &mut Controller, timeout: Duration, idle_sleep: Duration) -> Result<Status> {
    let deadline = Instant::now() + timeout;
    loop {
        ctl.tick()?;
        if matches!(ctl.state(), State::Idle | State::Fault) {
            break;
        }
        if Instant::now() >= deadline {
            eyre::bail!(
                "homing did not finish within {} ms (state {})",
                timeout.as_millis(),
                ctl.state()
            );
        }
        pace(ctl, idle_sleep);
    }
    Ok(ctl.status())
}
