//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "shutter", version, about = "Motorized shutter controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/shutter.toml")]
    pub config: PathBuf,

    /// Log as JSON lines and print status as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to [logging].level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Boot the controller and run the control loop, reading commands from stdin
    Run {
        /// Stop after this many milliseconds instead of waiting for `quit`
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Use the simulated mechanism even when built with hardware support
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Simulated starting position in turns above the closed stop (default: half the open travel)
        #[arg(long, value_name = "TURNS")]
        sim_start_turns: Option<f32>,
        /// Ignore stdin; only the button and the duration end the run
        #[arg(long, action = ArgAction::SetTrue)]
        no_console: bool,
        /// Enable real-time mode (SCHED_FIFO, mlockall, optional CPU pinning)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority and calls mlockall to keep the step loop out of page faults. May require elevated privileges or a raised memlock ulimit."
        )]
        rt: bool,
        /// Real-time priority for SCHED_FIFO (1..=max)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
        /// CPU index to pin the process to under --rt
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Boot the simulated mechanism, home it and print the status snapshot
    Status {
        /// Give up waiting for homing after this many milliseconds
        #[arg(long, value_name = "MS", default_value_t = 60_000)]
        timeout_ms: u64,
        /// Simulated starting position in turns above the closed stop
        #[arg(long, value_name = "TURNS")]
        sim_start_turns: Option<f32>,
    },
    /// Validate the config and construct the hardware without moving anything
    SelfCheck,
}
