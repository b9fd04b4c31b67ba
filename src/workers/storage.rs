//! Storage integrity worker
//!
//! Per iteration: `WRITE -> SEEK -> READ -> COMPARE -> FLUSH`.
//!
//! A failed write, seek or read skips the rest of that iteration and the loop carries on.
//! A mismatch ends the run on the spot and is never retried.
//!
//! Every verified block is flushed before the next write, otherwise later reads can land
//! at the wrong offset.

use crate::harness::StopSignal;
use crate::workers::WorkerCounters;
use busprobe_core::{
    BlockFile, IntegrityViolation, StorageOutcome, StorageReport, StorageStats, Volume,
    BLOCK_SIZE,
};
use rand::rngs::StdRng;
use rand::RngCore;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;

/// File handle that is closed exactly once, on whatever path leaves the run
struct ScopedFile<'a, F: BlockFile> {
    file: F,
    path: &'a Path,
}

impl<F: BlockFile> Deref for ScopedFile<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.file
    }
}

impl<F: BlockFile> DerefMut for ScopedFile<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        &mut self.file
    }
}

impl<F: BlockFile> Drop for ScopedFile<'_, F> {
    fn drop(&mut self) {
        if let Err(e) = self.file.close() {
            tracing::warn!("error closing '{}': {}", self.path.display(), e);
        }
    }
}

pub struct StorageIntegrityWorker<V: Volume, R: RngCore = StdRng> {
    volume: V,
    rng: R,
    counters: Arc<WorkerCounters>,
    yield_every_iteration: bool,
}

impl<V: Volume, R: RngCore> StorageIntegrityWorker<V, R> {
    pub fn new(volume: V, rng: R) -> Self {
        Self {
            volume,
            rng,
            counters: Arc::new(WorkerCounters::new()),
            yield_every_iteration: true,
        }
    }

    /// Publish progress through shared counters
    pub fn with_counters(mut self, counters: Arc<WorkerCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_yield(mut self, yield_every_iteration: bool) -> Self {
        self.yield_every_iteration = yield_every_iteration;
        self
    }

    pub fn volume(&self) -> &V {
        &self.volume
    }

    /// Run `iteration_count` write/verify iterations against `path`
    pub fn run(&mut self, path: &Path, iteration_count: u64) -> StorageReport {
        self.run_until(path, Some(iteration_count), &StopSignal::new())
    }

    /// Run until the budget is spent, a mismatch is found, or `stop` is raised.
    /// `None` runs until stopped.
    pub fn run_until(
        &mut self,
        path: &Path,
        budget: Option<u64>,
        stop: &StopSignal,
    ) -> StorageReport {
        let span = tracing::debug_span!("storage_integrity", path = %path.display());
        let _guard = span.enter();

        let file = match self.volume.open_for_update(path) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("error opening file '{}': {}", path.display(), e);
                self.counters.mark_finished();
                return StorageReport::open_failed(e.to_string());
            }
        };
        let mut file = ScopedFile { file, path };

        let mut stats = StorageStats::default();
        let mut outcome = StorageOutcome::CompletedFully;
        let mut written = [0u8; BLOCK_SIZE];
        let mut readback = [0u8; BLOCK_SIZE];

        loop {
            if budget.is_some_and(|limit| stats.iterations >= limit) {
                break;
            }
            if stop.is_raised() {
                tracing::debug!(iterations = stats.iterations, "Stop requested");
                outcome = StorageOutcome::Stopped;
                break;
            }

            let failures_before = stats.transient_failures();
            let iteration = stats.iterations;
            if let Some(violation) =
                self.run_iteration(&mut *file, path, iteration, &mut written, &mut readback, &mut stats)
            {
                outcome = StorageOutcome::StoppedOnMismatch(violation);
                break;
            }

            stats.iterations += 1;
            self.counters.record_iteration();
            if stats.transient_failures() > failures_before {
                self.counters.record_transient_failure();
            }

            if self.yield_every_iteration {
                std::thread::yield_now();
            }
        }

        drop(file);
        self.counters.mark_finished();

        tracing::info!(
            "wrote {} bytes of data to flash, successfully",
            stats.bytes_written()
        );

        StorageReport { outcome, stats }
    }

    /// One write/verify cycle. Returns the violation if the read-back differs.
    fn run_iteration<F: BlockFile>(
        &mut self,
        file: &mut F,
        path: &Path,
        iteration: u64,
        written: &mut [u8; BLOCK_SIZE],
        readback: &mut [u8; BLOCK_SIZE],
        stats: &mut StorageStats,
    ) -> Option<IntegrityViolation> {
        self.rng.fill_bytes(written);

        let pos = match file.tell() {
            Ok(pos) => pos,
            Err(e) => {
                tracing::warn!(iteration, "error reading position of '{}': {}", path.display(), e);
                stats.seek_failures += 1;
                return None;
            }
        };

        match file.write_block(written) {
            Ok(n) if n == BLOCK_SIZE => {}
            Ok(n) => {
                tracing::warn!(
                    iteration,
                    offset = pos,
                    "error writing data to '{}': short write ({} of {} bytes)",
                    path.display(),
                    n,
                    BLOCK_SIZE
                );
                stats.write_failures += 1;
                return None;
            }
            Err(e) => {
                tracing::warn!(iteration, offset = pos, "error writing data to '{}': {}", path.display(), e);
                stats.write_failures += 1;
                return None;
            }
        }

        if let Err(e) = file.seek_to(pos) {
            tracing::warn!(iteration, offset = pos, "error seeking '{}': {}", path.display(), e);
            stats.seek_failures += 1;
            return None;
        }

        match file.read_block(readback) {
            Ok(n) if n == BLOCK_SIZE => {}
            Ok(n) => {
                tracing::warn!(
                    iteration,
                    offset = pos,
                    "error reading data from '{}': short read ({} of {} bytes)",
                    path.display(),
                    n,
                    BLOCK_SIZE
                );
                stats.read_failures += 1;
                return None;
            }
            Err(e) => {
                tracing::warn!(iteration, offset = pos, "error reading data from '{}': {}", path.display(), e);
                stats.read_failures += 1;
                return None;
            }
        }

        if let Some(violation) = IntegrityViolation::compare(iteration, pos, written, readback) {
            tracing::error!(
                iteration,
                offset = pos,
                first_mismatch = violation.first_mismatch,
                differing_bytes = violation.differing_bytes,
                "data not written to disk, properly"
            );
            return Some(violation);
        }
        stats.verified += 1;

        match file.flush() {
            Ok(()) => stats.flushes += 1,
            Err(e) => {
                tracing::warn!(iteration, "error flushing '{}': {}", path.display(), e);
                stats.flush_failures += 1;
            }
        }

        None
    }
}
