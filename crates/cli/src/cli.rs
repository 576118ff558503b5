//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Colony Query - trajectories, interactions and tag statistics of tracked ants
#[derive(Parser, Debug)]
#[command(
    name = "colony-query",
    author,
    version,
    about = "Query engine for colony tracking data",
    long_about = "Identifies tagged ants, detects contacts between their body parts, \n\
                  segments trajectories and interactions, and reports per-tag \n\
                  detection statistics."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "COLONY_QUERY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "COLONY_QUERY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a query over a synthetic colony
    Run(RunArgs),

    /// Compute per-tag detection statistics
    Stats(StatsArgs),

    /// Validate configuration file
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Query kinds
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    /// Identified frames
    Identify,
    /// Identified frames and their collisions
    Collide,
    /// Ant trajectories
    Trajectories,
    /// Interactions and the trajectories they refer to
    Interactions,
}

/// Synthetic colony generation
#[derive(Args, Debug, Clone)]
pub struct ColonyArgs {
    /// Number of spaces, each with its own colony
    #[arg(long, default_value = "1")]
    pub spaces: u32,

    /// Ants per space
    #[arg(long, default_value = "8")]
    pub ants: u32,

    /// Frames per space
    #[arg(long, default_value = "1000")]
    pub frames: u64,

    /// Frame rate in Hz
    #[arg(long, default_value = "10.0")]
    pub frame_rate: f64,

    /// Probability that a tag is detected in a frame
    #[arg(long, default_value = "0.95")]
    pub detection_rate: f64,

    /// Emit every n-th frame malformed
    #[arg(long)]
    pub malformed_every: Option<u64>,

    /// Radius of the body capsule of every ant, pixels
    #[arg(long, default_value = "10.0")]
    pub capsule_radius: f64,

    /// Frames per segment
    #[arg(long, default_value = "500")]
    pub segment_frames: usize,

    #[arg(long, default_value = "42", env = "COLONY_QUERY_SEED")]
    pub seed: u64,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "COLONY_QUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Query to run
    #[arg(long, value_enum, default_value = "interactions")]
    pub query: QueryKind,

    #[command(flatten)]
    pub colony: ColonyArgs,

    /// Keep only these ants (repeatable)
    #[arg(long = "ant")]
    pub ant_filter: Vec<u32>,

    /// Query start, seconds after the first frame
    #[arg(long)]
    pub from_secs: Option<f64>,

    /// Query end, seconds after the first frame
    #[arg(long)]
    pub to_secs: Option<f64>,

    /// Override pipeline.workers from configuration
    #[arg(long, env = "COLONY_QUERY_WORKERS")]
    pub workers: Option<usize>,

    /// Run every stage on one thread
    #[arg(long)]
    pub single_threaded: bool,

    /// Override segmentation.max_gap_ms from configuration
    #[arg(long)]
    pub max_gap_ms: Option<u64>,

    /// Metrics server port
    #[arg(long, env = "COLONY_QUERY_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `stats` command
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "COLONY_QUERY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub colony: ColonyArgs,

    /// Override statistics.cache_dir from configuration
    #[arg(long, env = "COLONY_QUERY_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Only report cached results, never compute
    #[arg(long)]
    pub cached_only: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "colony.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults apply when absent
    #[arg(short, long, env = "COLONY_QUERY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as TOML instead of a summary
    #[arg(long, conflicts_with = "json")]
    pub toml: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for contracts::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => contracts::LogFormat::Json,
            LogFormat::Pretty => contracts::LogFormat::Pretty,
            LogFormat::Compact => contracts::LogFormat::Compact,
        }
    }
}
