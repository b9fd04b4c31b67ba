use crate::arena::MemoryArena;
use crate::cli::commands::print_json;
use crate::cli::output::*;
use crate::harness::StopSignal;
use crate::rng::{resolve_seed, worker_rng, BUS_STREAM};
use crate::workers::BusSaturationWorker;
use busprobe_core::Config;
use clap::Args;

#[derive(Args)]
pub struct BusArgs {
    /// Fill passes to run
    #[arg(short = 'n', long, default_value = "16")]
    pub passes: u64,

    /// Memory arena size in bytes; overrides bus.arena_size
    #[arg(long)]
    pub arena_size: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: BusArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(arena_size) = args.arena_size {
        config.bus.arena_size = arena_size;
    }
    if args.passes == 0 {
        anyhow::bail!(busprobe_core::BusprobeError::InvalidInput(
            "--passes must be at least 1".to_string()
        ));
    }
    config.validate()?;

    let seed = resolve_seed(config.rng.seed);
    let arena = MemoryArena::new(config.bus.arena_size)?;
    if !args.json {
        action(&format!(
            "Filling {} arena {} times (seed {})",
            format_size(arena.len() as u64),
            args.passes,
            seed
        ));
    }

    let mut worker = BusSaturationWorker::new(arena, worker_rng(seed, BUS_STREAM))
        .with_yield(config.scheduler.yield_every_iteration);
    let report = worker.run(Some(args.passes), &StopSignal::new());

    if args.json {
        print_json(&report)?;
    } else {
        print_bus_report(&report);
        success(&format!("Pushed {} over the bus", format_size(report.bytes_filled())));
    }
    Ok(())
}
