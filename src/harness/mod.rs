//! Concurrent harness
//!
//! Starts the bus saturation and storage integrity workers on their own named threads with
//! the same stack size and nominal priority, and hands back a [`HarnessHandle`] that can be
//! polled, waited on or shut down.
//!
//! Host threads get no OS priority change: both workers run at the process default, which
//! keeps them equal. The configured priority is recorded on each thread's log span.

pub mod stop;

pub use stop::StopSignal;

use crate::arena::MemoryArena;
use crate::rng::{resolve_seed, worker_rng, BUS_STREAM, STORAGE_STREAM};
use crate::workers::{BusSaturationWorker, StorageIntegrityWorker, WorkerCounters};
use busprobe_core::{BusReport, BusprobeError, BusprobeResult, Config, StorageReport, Volume};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const EXIT_POLL: Duration = Duration::from_millis(25);

/// Which worker a message is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Bus,
    Storage,
}

impl WorkerKind {
    pub fn thread_name(&self) -> &'static str {
        match self {
            WorkerKind::Bus => "bus-saturation",
            WorkerKind::Storage => "storage-integrity",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.thread_name())
    }
}

/// Scheduling parameters shared by both workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub priority: u8,
    pub stack_size: usize,
}

impl TaskSpec {
    fn spawn<T, F>(&self, kind: WorkerKind, exits: Sender<WorkerKind>, body: F) -> BusprobeResult<JoinHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let priority = self.priority;
        thread::Builder::new()
            .name(kind.thread_name().to_string())
            .stack_size(self.stack_size)
            .spawn(move || {
                let _notice = ExitNotice { kind, exits };
                let span = tracing::info_span!("worker", name = kind.thread_name(), priority);
                let _guard = span.enter();
                body()
            })
            .map_err(|e| BusprobeError::Worker(format!("failed to spawn {}: {}", kind, e)))
    }
}

/// Posts the worker kind when the thread body ends, panics included
struct ExitNotice {
    kind: WorkerKind,
    exits: Sender<WorkerKind>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.exits.send(self.kind);
    }
}

/// Result of a harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessSummary {
    /// Run seed; pass it back with `--seed` to replay the same data
    pub seed: u64,
    pub elapsed_ms: u64,
    pub bus: BusReport,
    pub storage: StorageReport,
}

impl HarnessSummary {
    /// True when the storage worker found no corruption and its file opened
    pub fn is_clean(&self) -> bool {
        self.storage.outcome.is_clean()
    }
}

pub struct Harness {
    config: Config,
    seed: u64,
}

impl Harness {
    pub fn new(config: Config) -> BusprobeResult<Self> {
        config.validate()?;
        let seed = resolve_seed(config.rng.seed);
        Ok(Self { config, seed })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn task_spec(&self) -> TaskSpec {
        TaskSpec {
            priority: self.config.scheduler.priority,
            stack_size: self.config.scheduler.stack_size,
        }
    }

    /// Spawn both workers against `volume`
    pub fn start<V: Volume + 'static>(&self, volume: V) -> BusprobeResult<HarnessHandle> {
        let arena = MemoryArena::new(self.config.bus.arena_size)?;
        let stop = StopSignal::new();
        let bus_counters = Arc::new(WorkerCounters::new());
        let storage_counters = Arc::new(WorkerCounters::new());
        let (exit_tx, exit_rx) = channel::unbounded();
        let spec = self.task_spec();
        let yield_every = self.config.scheduler.yield_every_iteration;

        tracing::info!(
            seed = self.seed,
            priority = spec.priority,
            stack_size = spec.stack_size,
            "Starting workers"
        );

        let mut bus_worker = BusSaturationWorker::new(arena, worker_rng(self.seed, BUS_STREAM))
            .with_counters(Arc::clone(&bus_counters))
            .with_yield(yield_every);
        let bus_budget = self.config.bus.pass_budget();
        let bus_stop = stop.clone();
        let bus = spec.spawn(WorkerKind::Bus, exit_tx.clone(), move || {
            bus_worker.run(bus_budget, &bus_stop)
        })?;

        let mut storage_worker =
            StorageIntegrityWorker::new(volume, worker_rng(self.seed, STORAGE_STREAM))
                .with_counters(Arc::clone(&storage_counters))
                .with_yield(yield_every);
        let path = PathBuf::from(&self.config.storage.file_name);
        let storage_budget = self.config.storage.iteration_budget();
        let storage_stop = stop.clone();
        let storage = match spec.spawn(WorkerKind::Storage, exit_tx, move || {
            let report = storage_worker.run_until(&path, storage_budget, &storage_stop);
            if !report.outcome.is_clean() {
                storage_stop.raise();
            }
            report
        }) {
            Ok(handle) => handle,
            Err(e) => {
                stop.raise();
                let _ = bus.join();
                return Err(e);
            }
        };

        Ok(HarnessHandle {
            seed: self.seed,
            started: Instant::now(),
            stop,
            bus: Some(bus),
            storage: Some(storage),
            bus_counters,
            storage_counters,
            exits: exit_rx,
        })
    }
}

/// Running harness. Dropping it stops and joins both workers.
pub struct HarnessHandle {
    seed: u64,
    started: Instant,
    stop: StopSignal,
    bus: Option<JoinHandle<BusReport>>,
    storage: Option<JoinHandle<StorageReport>>,
    bus_counters: Arc<WorkerCounters>,
    storage_counters: Arc<WorkerCounters>,
    exits: Receiver<WorkerKind>,
}

impl HarnessHandle {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn bus_counters(&self) -> Arc<WorkerCounters> {
        Arc::clone(&self.bus_counters)
    }

    pub fn storage_counters(&self) -> Arc<WorkerCounters> {
        Arc::clone(&self.storage_counters)
    }

    /// Wait up to `timeout` for a worker to finish
    pub fn next_exit(&self, timeout: Duration) -> Option<WorkerKind> {
        self.exits.recv_timeout(timeout).ok()
    }

    /// Join the storage worker, then stop and join the bus worker
    pub fn wait(mut self) -> BusprobeResult<HarnessSummary> {
        self.finish()
    }

    /// Like [`wait`](Self::wait), but raise the stop signal once `limit` has passed
    pub fn wait_for(mut self, limit: Duration) -> BusprobeResult<HarnessSummary> {
        let deadline = self.started + limit;
        loop {
            // The storage exit notice may already have been taken by `next_exit`
            if self.storage.as_ref().is_some_and(|h| h.is_finished()) {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::info!("Time limit of {:?} reached, stopping workers", limit);
                self.stop.raise();
                break;
            }
            match self.exits.recv_timeout(remaining.min(EXIT_POLL)) {
                Ok(WorkerKind::Storage) | Err(RecvTimeoutError::Disconnected) => break,
                Ok(WorkerKind::Bus) | Err(RecvTimeoutError::Timeout) => continue,
            }
        }
        self.finish()
    }

    /// Stop both workers after their current iteration and join them
    pub fn shutdown(mut self) -> BusprobeResult<HarnessSummary> {
        self.stop.raise();
        self.finish()
    }

    fn finish(&mut self) -> BusprobeResult<HarnessSummary> {
        let storage = join(WorkerKind::Storage, self.storage.take());
        self.stop.raise();
        let bus = join(WorkerKind::Bus, self.bus.take());

        let summary = HarnessSummary {
            seed: self.seed,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            bus: bus?,
            storage: storage?,
        };
        tracing::debug!(
            passes = summary.bus.passes,
            iterations = summary.storage.stats.iterations,
            outcome = summary.storage.outcome.label(),
            "Harness finished"
        );
        Ok(summary)
    }
}

impl Drop for HarnessHandle {
    fn drop(&mut self) {
        if self.bus.is_some() || self.storage.is_some() {
            self.stop.raise();
            let _ = join(WorkerKind::Storage, self.storage.take());
            let _ = join(WorkerKind::Bus, self.bus.take());
        }
    }
}

fn join<T>(kind: WorkerKind, handle: Option<JoinHandle<T>>) -> BusprobeResult<T> {
    let handle = handle.ok_or_else(|| BusprobeError::Worker(format!("{} already joined", kind)))?;
    handle
        .join()
        .map_err(|_| BusprobeError::Worker(format!("{} worker panicked", kind)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use busprobe_core::StorageOutcome;
    use busprobe_test::{Fault, FaultPlan, FaultyVolume};
    use pretty_assertions::assert_eq;

    fn small_config(iterations: u64) -> Config {
        let mut config = Config::default();
        config.bus.arena_size = 16 * 1024;
        config.storage.iterations = iterations;
        config.rng.seed = Some(42);
        config
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = small_config(4);
        config.bus.arena_size = 0;
        assert!(matches!(Harness::new(config), Err(BusprobeError::Configuration(_))));
    }

    #[test]
    fn test_configured_seed_is_used() {
        let harness = Harness::new(small_config(4)).unwrap();
        assert_eq!(harness.seed(), 42);
    }

    #[test]
    fn test_wait_runs_storage_budget_and_stops_bus() {
        let volume = FaultyVolume::new(300 * 1024);
        let handle = Harness::new(small_config(32)).unwrap().start(volume.clone()).unwrap();

        let summary = handle.wait().unwrap();

        assert_eq!(summary.seed, 42);
        assert_eq!(summary.storage.outcome, StorageOutcome::CompletedFully);
        assert_eq!(summary.storage.stats.iterations, 32);
        assert_eq!(volume.flushes(), 32);
        assert_eq!(volume.closes(), 1);
        assert!(summary.is_clean());
    }

    #[test]
    fn test_mismatch_stops_bus_worker() {
        let plan = FaultPlan::new().at(3, Fault::CorruptAfterWrite { index: 0 });
        let volume = FaultyVolume::new(300 * 1024).with_plan(plan);
        let handle = Harness::new(small_config(0)).unwrap().start(volume).unwrap();

        let bus_counters = handle.bus_counters();
        let summary = handle.wait().unwrap();

        assert_eq!(summary.storage.violation().map(|v| v.iteration), Some(3));
        assert!(!summary.is_clean());
        assert!(bus_counters.is_finished());
    }

    #[test]
    fn test_shutdown_stops_unbounded_workers() {
        let handle = Harness::new(small_config(0))
            .unwrap()
            .start(FaultyVolume::new(300 * 1024))
            .unwrap();

        let summary = handle.shutdown().unwrap();
        assert_eq!(summary.storage.outcome, StorageOutcome::Stopped);
    }

    #[test]
    fn test_wait_for_stops_after_limit() {
        let handle = Harness::new(small_config(0))
            .unwrap()
            .start(FaultyVolume::new(300 * 1024))
            .unwrap();

        let summary = handle.wait_for(Duration::from_millis(50)).unwrap();
        assert_eq!(summary.storage.outcome, StorageOutcome::Stopped);
    }

    #[test]
    fn test_open_failure_is_reported_and_ends_run() {
        let volume = FaultyVolume::new(1024).failing_open(std::io::ErrorKind::NotFound);
        let handle = Harness::new(small_config(0)).unwrap().start(volume.clone()).unwrap();

        let summary = handle.wait().unwrap();
        assert!(matches!(summary.storage.outcome, StorageOutcome::OpenFailed { .. }));
        assert_eq!(volume.closes(), 0);
    }

    #[test]
    fn test_exit_notices_arrive() {
        let handle = Harness::new(small_config(2))
            .unwrap()
            .start(FaultyVolume::new(300 * 1024))
            .unwrap();

        assert_eq!(handle.next_exit(Duration::from_secs(10)), Some(WorkerKind::Storage));
        handle.stop_signal().raise();
        assert_eq!(handle.next_exit(Duration::from_secs(10)), Some(WorkerKind::Bus));
    }

    #[test]
    fn test_wait_for_returns_when_exit_was_already_taken() {
        let handle = Harness::new(small_config(2))
            .unwrap()
            .start(FaultyVolume::new(300 * 1024))
            .unwrap();
        assert_eq!(handle.next_exit(Duration::from_secs(10)), Some(WorkerKind::Storage));

        let started = Instant::now();
        let summary = handle.wait_for(Duration::from_secs(30)).unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(summary.storage.outcome, StorageOutcome::CompletedFully);
        assert_eq!(summary.storage.stats.iterations, 2);
    }
}
