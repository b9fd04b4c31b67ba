pub mod commands;
pub mod output;

use anyhow::Context;
use busprobe_core::config::resolve_config;
use busprobe_core::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "busprobe",
    version,
    about = "Concurrent external-RAM and flash-filesystem stress harness",
    long_about = "busprobe drives a memory arena and a flash-backed file at the same time to \
                  provoke faults on a shared external bus. The storage worker writes random \
                  blocks and verifies every one; the first mismatch ends the run."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to $BUSPROBE_HOME/config.toml when present)
    #[arg(long, value_name = "FILE", env = "BUSPROBE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Seed for the random sources, to replay an earlier run
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

impl Cli {
    /// Resolve the effective config, with `--seed` applied on top
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = resolve_config(self.config.as_deref()).with_context(|| match &self.config {
            Some(path) => format!("Failed to load config from {}", path.display()),
            None => "Failed to load config".to_string(),
        })?;

        if let Some(seed) = self.seed {
            config.rng.seed = Some(seed);
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run both workers concurrently
    Run(commands::run::RunArgs),

    /// Run the storage integrity worker alone
    Storage(commands::storage::StorageArgs),

    /// Run the bus saturation worker alone for a number of passes
    Bus(commands::bus::BusArgs),

    /// Create the zero-filled backing file on the volume
    Prepare(commands::prepare::PrepareArgs),

    /// Show board and volume information
    Info(commands::info::InfoArgs),

    /// Print the effective configuration or write a default one
    Config(commands::config::ConfigArgs),
}
