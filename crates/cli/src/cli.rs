//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::{SensorMode, FPN_CALCULATION_FRAMES};
use std::path::PathBuf;

/// CeleX MIPI - event sensor data processor
#[derive(Parser, Debug)]
#[command(
    name = "celex-mipi",
    author,
    version,
    about = "CeleX event sensor MIPI data processor",
    long_about = "Decodes raw MIPI captures from a CeleX event sensor.\n\n\
                  Replays capture files through the frame processor, exports the\n\
                  published pictures and event vectors, and calibrates FPN tables."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CELEX_VERBOSE")]
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
        env = "CELEX_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a capture file through the processor
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Calibrate an FPN table from a full-picture capture
    Fpn(FpnArgs),

    /// Write a synthetic capture file
    Synth(SynthArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults if absent
    #[arg(short, long, env = "CELEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Capture file to replay
    #[arg(short, long, env = "CELEX_INPUT")]
    pub input: PathBuf,

    /// Override the fixed sensor mode
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<SensorMode>,

    /// Override the FPN table path
    #[arg(long, env = "CELEX_FPN")]
    pub fpn: Option<PathBuf>,

    /// Export published pictures and event vectors under this directory
    #[arg(short, long, env = "CELEX_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Event vector file encoding
    #[arg(long, value_enum, default_value = "json")]
    pub event_format: EventFormat,

    /// Maximum number of batches to process (0 = unlimited)
    #[arg(long, default_value = "0", env = "CELEX_MAX_BATCHES")]
    pub max_batches: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CELEX_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without processing
    #[arg(long)]
    pub dry_run: bool,

    /// Export queue capacity
    #[arg(long, default_value = "64", env = "CELEX_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CELEX_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "celex.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults if absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `fpn` command
#[derive(Parser, Debug)]
pub struct FpnArgs {
    /// Path to configuration file; built-in defaults if absent
    #[arg(short, long, env = "CELEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Full-picture capture file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the FPN table
    #[arg(short, long, default_value = "fpn.txt")]
    pub output: PathBuf,

    /// Number of frames to average
    #[arg(long, default_value_t = FPN_CALCULATION_FRAMES)]
    pub frames: u32,
}

/// Arguments for the `synth` command
#[derive(Parser, Debug)]
pub struct SynthArgs {
    /// Capture file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// MIPI format tag (0, 1 or 2)
    #[arg(long, default_value = "2")]
    pub format: u8,

    /// Number of batches
    #[arg(long, default_value = "100")]
    pub batches: u32,

    /// Row packets per event batch
    #[arg(long, default_value = "200")]
    pub rows_per_batch: u32,

    /// Column events per row packet
    #[arg(long, default_value = "4")]
    pub events_per_row: u16,

    /// Write full-picture batches (one whole frame each) instead of events
    #[arg(long)]
    pub full_frame: bool,

    /// IMU samples per batch
    #[arg(long, default_value = "0")]
    pub imu_per_batch: u16,

    /// Sensor rows
    #[arg(long, default_value = "800")]
    pub rows: u16,

    /// Sensor columns
    #[arg(long, default_value = "1280")]
    pub cols: u16,
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

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

/// Event vector file encoding
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum EventFormat {
    #[default]
    Json,
    Bincode,
}

impl From<EventFormat> for publisher::EventFileFormat {
    fn from(format: EventFormat) -> Self {
        match format {
            EventFormat::Json => publisher::EventFileFormat::Json,
            EventFormat::Bincode => publisher::EventFileFormat::Bincode,
        }
    }
}

/// Accepts the snake_case mode names used in config files
fn parse_mode(s: &str) -> Result<SensorMode, String> {
    SensorMode::ALL
        .iter()
        .copied()
        .find(|m| m.as_str() == s)
        .ok_or_else(|| {
            let names: Vec<_> = SensorMode::ALL.iter().map(|m| m.as_str()).collect();
            format!("unknown mode '{s}', expected one of: {}", names.join(", "))
        })
}
