//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// INS Bridge - sensor device to telemetry sink pipeline
#[derive(Parser, Debug)]
#[command(
    name = "ins-bridge",
    author,
    version,
    about = "INS/GNSS sensor telemetry bridge",
    long_about = "Bridges a hardware INS/GNSS sensor device to telemetry sinks.\n\n\
                  Opens the device link, negotiates the flash configuration \n\
                  handshake, requests the configured broadcast streams, resolves \n\
                  device timestamps into one time base and publishes synchronized \n\
                  records to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "INS_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "INS_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the telemetry bridge
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Trigger a magnetometer calibration on the device
    Calibrate(CalibrateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "INS_BRIDGE_CONFIG")]
    pub config: PathBuf,

    /// Override the serial port from configuration
    #[arg(long, env = "INS_BRIDGE_PORT")]
    pub port: Option<String>,

    /// Override the baud rate from configuration
    #[arg(long, env = "INS_BRIDGE_BAUDRATE")]
    pub baudrate: Option<u32>,

    /// Replay a recorded JSON-lines record log instead of opening hardware
    #[arg(long, env = "INS_BRIDGE_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Loop the replay log when it is exhausted
    #[arg(long, requires = "replay")]
    pub replay_loop: bool,

    /// Run against a scripted in-memory device (no hardware required)
    #[arg(long, conflicts_with = "replay")]
    pub mock: bool,

    /// Maximum number of records to publish (0 = unlimited)
    #[arg(long, default_value = "0", env = "INS_BRIDGE_MAX_RECORDS")]
    pub max_records: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "INS_BRIDGE_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "INS_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the computed broadcast plan
    #[arg(long)]
    pub streams: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `calibrate` command
#[derive(Parser, Debug)]
pub struct CalibrateArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Calibration mode
    #[arg(long, value_enum, default_value = "multi-axis")]
    pub mode: CalMode,

    /// Send the command to a scripted in-memory device (testing)
    #[arg(long)]
    pub mock: bool,
}

/// Magnetometer calibration mode
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CalMode {
    /// Rotate about a single axis
    SingleAxis,
    /// Rotate about all axes
    MultiAxis,
}

impl From<CalMode> for contracts::MagCalMode {
    fn from(mode: CalMode) -> Self {
        match mode {
            CalMode::SingleAxis => contracts::MagCalMode::SingleAxis,
            CalMode::MultiAxis => contracts::MagCalMode::MultiAxis,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
