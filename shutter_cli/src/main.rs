mod cli;
mod console;
mod error_fmt;
mod platform;
mod report;
mod rt;
mod run;

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use shutter_config::Config;
use shutter_core::{Controller, State, Status};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{format_error_json, humanize};
use crate::report::{status_json, status_line};
use crate::run::RunOptions;

const EXIT_ERROR: u8 = 1;
/// The controller ended in the homing fault state.
const EXIT_FAULT: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }
    match real_main(&cli) {
        Ok(code) => code,
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            tracing::debug!(error = ?e, "exiting on error");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = shutter_config::load_toml(&text)
        .wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &shutter_config::Logging) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level `{level}`"))?;

    // stdout carries status output, logs go to stderr
    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().compact().with_writer(std::io::stderr).boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let Some(name) = path.file_name() else {
                eyre::bail!("logging.file `{}` has no file name", path.display());
            };
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("installing tracing subscriber")
}

fn sim_backend(cfg: &Config, start_turns: Option<f32>) -> Result<(Controller, &'static str)> {
    let (ctl, _mech) = run::sim_controller(cfg, start_turns)?;
    Ok((ctl, "sim"))
}

/// GPIO backend unless `--sim` was given.
#[cfg(all(feature = "hardware", target_os = "linux"))]
fn controller(
    cfg: &Config,
    sim: bool,
    start_turns: Option<f32>,
) -> Result<(Controller, &'static str)> {
    if sim {
        sim_backend(cfg, start_turns)
    } else {
        Ok((run::hardware_controller(cfg)?, "gpio"))
    }
}

/// Built without hardware support: always the simulated mechanism.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn controller(
    cfg: &Config,
    _sim: bool,
    start_turns: Option<f32>,
) -> Result<(Controller, &'static str)> {
    sim_backend(cfg, start_turns)
}

fn print_final(status: &Status, json: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if json {
        writeln!(out, "{}", status_json(status, &platform::read_health()))?;
    } else {
        writeln!(out, "{}", status_line(status))?;
    }
    Ok(())
}

fn exit_for(status: &Status) -> ExitCode {
    if status.state == State::Fault {
        ExitCode::from(EXIT_FAULT)
    } else {
        ExitCode::SUCCESS
    }
}

fn real_main(cli: &Cli) -> Result<ExitCode> {
    let cfg = load_config(&cli.config)?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_tracing(cli.json, &level, &cfg.logging)?;
    let idle_sleep = Duration::from_micros(cfg.runner.idle_sleep_us);

    match &cli.cmd {
        Commands::Run {
            duration_ms,
            sim,
            sim_start_turns,
            no_console,
            rt,
            rt_prio,
            rt_lock,
            rt_cpu,
        } => {
            if *rt {
                rt::setup_rt_once(*rt_prio, *rt_lock, *rt_cpu);
            }
            let (mut ctl, backend) = controller(&cfg, *sim, *sim_start_turns)?;
            tracing::info!(backend, config = %cli.config.display(), "controller started");

            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("installing Ctrl-C handler")?;

            let (tx, rx) = crossbeam_channel::unbounded();
            if *no_console {
                drop(tx);
            } else {
                console::spawn_stdin(tx).wrap_err("starting console thread")?;
            }

            let opts = RunOptions {
                duration: duration_ms.map(Duration::from_millis),
                idle_sleep,
                json: cli.json,
            };
            let status = {
                let mut out = std::io::stdout().lock();
                run::run_loop(&mut ctl, &rx, &shutdown, &opts, &mut out)?
            };
            print_final(&status, cli.json)?;
            Ok(exit_for(&status))
        }
        Commands::Status {
            timeout_ms,
            sim_start_turns,
        } => {
            let (mut ctl, _mech) = run::sim_controller(&cfg, *sim_start_turns)?;
            let status = run::home(&mut ctl, Duration::from_millis(*timeout_ms), idle_sleep)?;
            ctl.shutdown()?;
            print_final(&status, cli.json)?;
            Ok(exit_for(&status))
        }
        Commands::SelfCheck => {
            let (mut ctl, backend) = controller(&cfg, false, None)?;
            ctl.shutdown()?;
            let mut out = std::io::stdout().lock();
            if cli.json {
                let health = platform::read_health();
                let v = serde_json::json!({
                    "ok": true,
                    "backend": backend,
                    "steps_per_rev": ctl.axis().steps_per_rev(),
                    "open_steps": ctl.axis().open_steps(),
                    "health": {
                        "mem_available_kb": health.mem_available_kb,
                        "cpu_mhz": health.cpu_mhz,
                        "device_id": health.device_id,
                    },
                });
                writeln!(out, "{v}")?;
            } else {
                writeln!(
                    out,
                    "self-check ok: backend={backend} steps_per_rev={} open_steps={}",
                    ctl.axis().steps_per_rev(),
                    ctl.axis().open_steps()
                )?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
