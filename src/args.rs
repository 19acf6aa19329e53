//! Commandline argument parsers using clap for TactileTracker

use crate::config::ExperimentConfig;
use clap::{Args, Parser};
use std::path::PathBuf;

/// Arguments of the tracking display.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct VisualizerArgs {
    /// Prefix for trial logs, which are written to <PREFIX>_<N>.csv
    pub prefix: Option<String>,

    /// Experiment config file in RON format
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Number of goals per test, overrides the config file
    #[arg(short = 'n', long = "trials")]
    pub trials: Option<usize>,

    /// Time between goal changes in milliseconds, overrides the config file
    #[arg(short = 'i', long = "interval")]
    pub interval_ms: Option<u64>,

    /// Where telemetry goes.
    #[command(flatten)]
    pub device: DeviceArgs,
}

/// How to pick the serial device. With none of these set, the first port the
/// host reports is used.
#[derive(Debug, Args, Clone)]
#[group(multiple = false)]
pub struct DeviceArgs {
    /// Path of the serial device to drive
    #[arg(short = 'd', long = "device")]
    pub path: Option<PathBuf>,

    /// Choose the serial device from a list before starting
    #[arg(long)]
    pub select_device: bool,

    /// Send telemetry to an in-memory loopback instead of a serial device
    #[arg(long)]
    pub dummy: bool,

    /// Run without any device
    #[arg(long)]
    pub no_device: bool,
}

impl VisualizerArgs {
    /// Apply the commandline overrides on top of `config`.
    pub fn apply(&self, mut config: ExperimentConfig) -> ExperimentConfig {
        if let Some(prefix) = &self.prefix {
            config.log_prefix = prefix.clone();
        }
        if let Some(trials) = self.trials {
            config.trials_per_test = trials;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.goal_interval_ms = interval_ms;
        }
        config
    }
}

/// Arguments of the serial monitor.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct MonitorArgs {
    /// Serial device to listen on, defaults to the first available port
    pub path: Option<PathBuf>,

    /// Baud rate of the serial link
    #[arg(short = 'b', long = "baud", default_value_t = 115200)]
    pub baud_rate: u32,
}
