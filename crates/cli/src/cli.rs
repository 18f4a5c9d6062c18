//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use observability::LogFormat;
use std::path::PathBuf;

/// Robot Driver - scheduling and recording core for robot data acquisition
#[derive(Parser, Debug)]
#[command(
    name = "robot-driver",
    author,
    version,
    about = "Robot data-acquisition driver",
    long_about = "Polls robot memory channels on their own schedules, publishes them to live\n\
                  listeners, keeps a rolling buffer of recent data and writes durable logs\n\
                  on demand (start/stop recording, dump the buffer)."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ROBOT_DRIVER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (json, pretty, compact)
    #[arg(long, default_value = "pretty", global = true, env = "ROBOT_DRIVER_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the driver against the simulated robot
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display configured channels and events
    Info(InfoArgs),

    /// Manage durable logs in the recording directory
    Files(FilesArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when absent
    #[arg(short, long, env = "ROBOT_DRIVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop after this many seconds (0 = until Ctrl-C)
    #[arg(long, default_value = "0", env = "ROBOT_DRIVER_DURATION")]
    pub duration: u64,

    /// Start a durable recording as soon as the driver is wired
    #[arg(long)]
    pub record: bool,

    /// Dump the rolling buffer under this prefix before exiting
    #[arg(long, value_name = "PREFIX")]
    pub dump_on_exit: Option<String>,

    /// Memory-list description files to register as extra channels
    #[arg(long = "memory-list", value_name = "FILE")]
    pub memory_lists: Vec<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "ROBOT_DRIVER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Update rate of the simulated robot (Hz)
    #[arg(long, default_value = "20", env = "ROBOT_DRIVER_SIM_FREQUENCY")]
    pub sim_frequency: f64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "driver.toml", env = "ROBOT_DRIVER_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "driver.toml", env = "ROBOT_DRIVER_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `files` command
#[derive(Args, Debug)]
pub struct FilesArgs {
    /// Configuration file naming the recording directory; defaults apply when absent
    #[arg(short, long, env = "ROBOT_DRIVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the recording directory
    #[arg(long, env = "ROBOT_DRIVER_RECORD_DIR")]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub action: FilesAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum FilesAction {
    /// List durable logs
    List,
    /// Remove every durable log
    Clean,
    /// Remove the given durable logs
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}
