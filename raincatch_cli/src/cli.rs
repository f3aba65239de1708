//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use raincatch_core::Direction;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "raincatch", version, about = "Rain-lid controller")]
pub struct Cli {
    /// Path to config TOML; compiled-in defaults are used when the file is absent
    #[arg(long, value_name = "FILE", default_value = "etc/raincatch.toml")]
    pub config: PathBuf,

    /// Optional volume calibration CSV (headers: distance_cm,liters)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log and print as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Do not touch the network (no weather, override or telemetry)
    #[arg(long, action = ArgAction::SetTrue)]
    pub offline: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LidDirection {
    Open,
    Close,
}

impl From<LidDirection> for Direction {
    fn from(d: LidDirection) -> Self {
        match d {
            LidDirection::Open => Direction::Open,
            LidDirection::Close => Direction::Close,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the supervisory loop (forever unless --cycles is given)
    Run {
        /// Stop after this many cycles (bench testing)
        #[arg(long, value_name = "N")]
        cycles: Option<u32>,
        /// Override the cycle period in seconds
        #[arg(long, value_name = "SECS")]
        cycle_secs: Option<u64>,
    },
    /// Read volume, rain and the dashboard override once; nothing moves
    SelfCheck,
    /// Drive the lid through one full travel without reporting it
    Actuate {
        #[arg(long, value_enum)]
        direction: LidDirection,
    },
}
