use busprobe::cli::{Cli, Commands};
use busprobe::BusprobeError;
use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(exit_code(&e));
    }
}

/// Log level from BUSPROBE_LOG, else RUST_LOG, else the -v count
fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_env("BUSPROBE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();
}

fn exit_code(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<BusprobeError>() {
        Some(BusprobeError::Configuration(_)) => 2,
        Some(BusprobeError::Io(_)) => 3,
        Some(BusprobeError::Mount(_)) | Some(BusprobeError::Open(_)) => 4,
        Some(BusprobeError::Integrity(_)) => 5,
        _ => 1,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;

    match cli.command {
        Commands::Run(args) => busprobe::cli::commands::run::run(args, config),
        Commands::Storage(args) => busprobe::cli::commands::storage::run(args, config),
        Commands::Bus(args) => busprobe::cli::commands::bus::run(args, config),
        Commands::Prepare(args) => busprobe::cli::commands::prepare::run(args, config),
        Commands::Info(args) => busprobe::cli::commands::info::run(args, config),
        Commands::Config(args) => busprobe::cli::commands::config::run(args, config),
    }
}
