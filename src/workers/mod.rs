//! The two stress workers
//!
//! - [`BusSaturationWorker`] fills the memory arena with one random byte per pass.
//! - [`StorageIntegrityWorker`] writes random blocks to a file and verifies every one.
//!
//! They share nothing but the physical bus; each can run alone or under the harness.

pub mod bus;
pub mod counters;
pub mod storage;

pub use bus::BusSaturationWorker;
pub use counters::WorkerCounters;
pub use storage::StorageIntegrityWorker;
