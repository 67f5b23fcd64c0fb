//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[inline]
pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "fader", version, about = "Motorized fader control CLI")]
pub struct Cli {
    /// Path to config TOML (typed); built-in defaults when the file is absent
    #[arg(long, value_name = "FILE", default_value = "etc/fader_config.toml")]
    pub config: PathBuf,

    /// Optional break-point CSV (strict `percent,tick` header)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Print results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Direction {
    /// Bottom to top
    Forward,
    /// Top to bottom
    Backward,
}

impl From<Direction> for fader_core::SweepDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Forward => Self::Forward,
            Direction::Backward => Self::Backward,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the fader to a position and wait until it settles
    Seek {
        /// Target position in percent of travel (0..=100)
        #[arg(long, value_name = "PCT")]
        to: f32,
        /// Give up (and stop the motor) after this many milliseconds
        #[arg(long, value_name = "MS", default_value_t = 5_000)]
        timeout_ms: u64,
    },
    /// Print position updates as the fader is moved by hand
    Follow {
        /// Stop after this many updates (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        count: Option<usize>,
    },
    /// Find the bottom end stop and print the regenerated break-points
    Calibrate,
    /// Time a full-speed sweep across all break-points
    Sweep {
        #[arg(long, value_enum, default_value_t = Direction::Forward)]
        direction: Direction,
    },
    /// Creep forward at low speed, printing how far each read moved
    Crawl {
        /// Stop at this raw tick (default: crawl.until_tick from the config)
        #[arg(long, value_name = "TICK")]
        until: Option<u16>,
    },
    /// Print raw ADC ticks whenever they change
    Raw {
        /// Stop after this many distinct readings (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        count: Option<usize>,
    },
    /// Quick health check (hardware presence / sim ok)
    SelfCheck,
}
