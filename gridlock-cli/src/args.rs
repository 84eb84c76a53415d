//! Command-line surface: one flat `clap::Parser` struct, short+long flags
//! where it makes sense, doc comments that double as `--help` text.

use std::path::PathBuf;

use clap::Parser;
use gridlock_common::config::{Algorithm, SimConfig, Strategy};
use gridlock_common::error::GridlockError;

/// Gridlock - a concurrent four-lane traffic-intersection simulator.
#[derive(Parser, Debug)]
#[command(name = "gridlock")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Deadlock-free scheduler for a four-lane traffic intersection")]
#[command(long_about = None)]
pub struct Args {
    /// Total simulated duration, in seconds.
    #[arg(long, default_value_t = 200)]
    pub duration: u64,

    /// Minimum seconds between vehicle arrivals.
    #[arg(long = "arrival-min", default_value_t = 1.0)]
    pub arrival_min: f64,

    /// Maximum seconds between vehicle arrivals.
    #[arg(long = "arrival-max", default_value_t = 3.0)]
    pub arrival_max: f64,

    /// Base scheduler time quantum, in seconds.
    #[arg(long, default_value_t = 3)]
    pub quantum: u64,

    /// Scheduling policy: sjf, mlfq, or prr.
    #[arg(long, default_value = "sjf")]
    pub algorithm: String,

    /// Allocation strategy: fifo, banker, or hybrid.
    #[arg(long, default_value = "hybrid")]
    pub strategy: String,

    /// Disable ANSI color in terminal snapshots.
    #[arg(long)]
    pub no_color: bool,

    /// Enable debug-level tracing.
    #[arg(long)]
    pub debug: bool,

    /// Write one CSV row per snapshot to this path.
    #[arg(long = "csv-out")]
    pub csv_out: Option<PathBuf>,

    /// Replay a deterministic scenario file instead of the random
    /// generator, using a fixed-seed arrival sequence.
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// How often to print a terminal snapshot, in seconds.
    #[arg(long = "update-interval", default_value_t = 1.0)]
    pub update_interval: f64,
}

impl Args {
    /// Build and validate a [`SimConfig`] from the parsed flags.
    pub fn into_sim_config(self) -> Result<SimConfig, GridlockError> {
        let algorithm: Algorithm = self.algorithm.parse().map_err(|reason| GridlockError::FatalInit { reason })?;
        let strategy: Strategy = self.strategy.parse().map_err(|reason| GridlockError::FatalInit { reason })?;

        let config = SimConfig {
            duration_secs: self.duration,
            arrival_min_secs: self.arrival_min,
            arrival_max_secs: self.arrival_max,
            quantum_secs: self.quantum,
            algorithm,
            strategy,
            color: !self.no_color,
            debug: self.debug,
            ..SimConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}
