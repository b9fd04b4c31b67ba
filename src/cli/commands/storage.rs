use crate::cli::commands::{outcome_result, print_json};
use crate::cli::output::*;
use crate::rng::{resolve_seed, worker_rng, STORAGE_STREAM};
use crate::workers::StorageIntegrityWorker;
use busprobe_core::Config;
use clap::Args;
use std::path::Path;

#[derive(Args)]
pub struct StorageArgs {
    /// Iterations to run (0 = until the first mismatch); overrides storage.iterations
    #[arg(short = 'n', long)]
    pub iterations: Option<u64>,

    /// Do not create the backing file when it is missing
    #[arg(long)]
    pub no_prepare: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: StorageArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(iterations) = args.iterations {
        config.storage.iterations = iterations;
    }
    config.validate()?;

    let volume = crate::mount_volume(&config)?;
    if !args.no_prepare && volume.is_mounted() {
        let (path, created) = crate::ensure_backing_file(&volume, &config.storage)?;
        if created && !args.json {
            action(&format!("Created backing file {}", path.display()));
        }
    }

    let seed = resolve_seed(config.rng.seed);
    if !args.json {
        action(&format!(
            "Verifying {} on {} (seed {})",
            config.storage.file_name,
            volume.root().display(),
            seed
        ));
    }

    let mut worker = StorageIntegrityWorker::new(volume, worker_rng(seed, STORAGE_STREAM))
        .with_yield(config.scheduler.yield_every_iteration);
    let report = worker.run_until(
        Path::new(&config.storage.file_name),
        config.storage.iteration_budget(),
        &crate::StopSignal::new(),
    );

    if args.json {
        print_json(&report)?;
    } else {
        print_storage_report(&report);
    }

    outcome_result(&report)
}
