use crate::cli::commands::{outcome_result, print_json};
use crate::cli::output::*;
use crate::harness::{Harness, HarnessHandle, WorkerKind};
use crate::platform::BoardInfo;
use clap::Args;
use busprobe_core::Config;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Args)]
pub struct RunArgs {
    /// Storage iterations (0 = until stopped); overrides storage.iterations
    #[arg(short = 'n', long)]
    pub iterations: Option<u64>,

    /// Stop both workers after this many seconds
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Memory arena size in bytes; overrides bus.arena_size
    #[arg(long)]
    pub arena_size: Option<usize>,

    /// Do not create the backing file when it is missing
    #[arg(long)]
    pub no_prepare: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(iterations) = args.iterations {
        config.storage.iterations = iterations;
    }
    if let Some(arena_size) = args.arena_size {
        config.bus.arena_size = arena_size;
    }
    if config.storage.iteration_budget().is_none() && args.duration.is_none() {
        tracing::warn!("No iteration budget or duration set; running until interrupted");
    }

    let harness = Harness::new(config)?;
    let board = BoardInfo::probe(&harness.config().volume);
    board.log_banner();
    if !args.json {
        section_header("busprobe");
        for line in board.banner() {
            info(&line);
        }
    }

    let volume = crate::mount_volume(harness.config())?;
    if !args.no_prepare && volume.is_mounted() {
        let (path, created) = crate::ensure_backing_file(&volume, &harness.config().storage)?;
        if created && !args.json {
            action(&format!("Created backing file {}", path.display()));
        }
    }

    let handle = harness.start(volume)?;
    if !args.json {
        info(&format!("Seed: {} (pass --seed {} to replay)", handle.seed(), handle.seed()));
    }

    let limit = args.duration.map(Duration::from_secs);
    let budget = harness.config().storage.iteration_budget();
    watch(&handle, budget, limit, args.json);

    let summary = handle.wait()?;
    if args.json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }

    outcome_result(&summary.storage)
}

/// Show live progress until the storage worker exits or the time limit passes
fn watch(handle: &HarnessHandle, budget: Option<u64>, limit: Option<Duration>, quiet: bool) {
    let progress = if quiet {
        ProgressBar::hidden()
    } else if let Some(total) = budget {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} iterations {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    };

    let started = Instant::now();
    let storage = handle.storage_counters();
    let bus = handle.bus_counters();

    loop {
        let exited = handle.next_exit(Duration::from_millis(100));

        progress.set_position(storage.iterations());
        progress.set_message(format!(
            "| {} bus passes | {} transient failures",
            bus.iterations(),
            storage.transient_failures()
        ));

        if exited == Some(WorkerKind::Storage) || storage.is_finished() {
            break;
        }
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            tracing::info!("Time limit reached, stopping workers");
            handle.stop_signal().raise();
            break;
        }
    }

    progress.finish_and_clear();
}
