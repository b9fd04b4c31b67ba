use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Live progress of one worker, readable from other threads while it runs
#[derive(Debug, Default)]
pub struct WorkerCounters {
    iterations: AtomicU64,
    transient_failures: AtomicU64,
    finished: AtomicBool,
}

impl WorkerCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transient_failure(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn transient_failures(&self) -> u64 {
        self.transient_failures.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}
