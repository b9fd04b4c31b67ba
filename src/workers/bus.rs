//! Bus saturation worker
//!
//! Each pass picks one random byte and writes it over the whole arena, producing a long
//! burst of sequential stores on the external-memory bus. There is no check on the arena
//! contents: a failure here shows up as a bus fault or a crash, not as a return value.

use crate::arena::MemoryArena;
use crate::harness::StopSignal;
use crate::workers::WorkerCounters;
use busprobe_core::BusReport;
use rand::rngs::StdRng;
use rand::RngCore;
use std::sync::Arc;

pub struct BusSaturationWorker<R: RngCore = StdRng> {
    arena: MemoryArena,
    rng: R,
    passes: u64,
    last_fill: Option<u8>,
    counters: Arc<WorkerCounters>,
    yield_every_pass: bool,
}

impl<R: RngCore> BusSaturationWorker<R> {
    pub fn new(arena: MemoryArena, rng: R) -> Self {
        Self {
            arena,
            rng,
            passes: 0,
            last_fill: None,
            counters: Arc::new(WorkerCounters::new()),
            yield_every_pass: true,
        }
    }

    /// Publish progress through shared counters
    pub fn with_counters(mut self, counters: Arc<WorkerCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_yield(mut self, yield_every_pass: bool) -> Self {
        self.yield_every_pass = yield_every_pass;
        self
    }

    /// Pick the fill byte for the next pass.
    ///
    /// The generator output is reduced modulo 255, so 0xFF is never chosen.
    pub fn next_fill_byte(&mut self) -> u8 {
        (self.rng.next_u32() % 255) as u8
    }

    /// Fill the whole arena with one random byte and return that byte
    pub fn run_once(&mut self) -> u8 {
        let byte = self.next_fill_byte();
        self.arena.fill(byte);

        self.passes += 1;
        self.last_fill = Some(byte);
        self.counters.record_iteration();

        tracing::info!(
            pass = self.passes,
            "filled buffer of size {} kB with 0x{:02X}",
            self.arena.len() / 1024,
            byte
        );
        byte
    }

    /// Run passes until the budget is spent or `stop` is raised
    pub fn run(&mut self, budget: Option<u64>, stop: &StopSignal) -> BusReport {
        let span = tracing::debug_span!("bus_saturation", arena_size = self.arena.len());
        let _guard = span.enter();

        let mut done = 0u64;
        loop {
            if budget.is_some_and(|limit| done >= limit) {
                break;
            }
            if stop.is_raised() {
                tracing::debug!(passes = done, "Stop requested");
                break;
            }

            self.run_once();
            done += 1;

            if self.yield_every_pass {
                std::thread::yield_now();
            }
        }

        self.counters.mark_finished();
        self.report()
    }

    pub fn report(&self) -> BusReport {
        BusReport {
            passes: self.passes,
            arena_size: self.arena.len(),
            last_fill: self.last_fill,
        }
    }

    pub fn arena(&self) -> &MemoryArena {
        &self.arena
    }
}
