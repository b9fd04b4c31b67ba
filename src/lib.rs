//! busprobe: concurrent external-RAM and flash-filesystem stress harness
//!
//! Two workers share nothing but the bus: one floods a memory arena with fill passes, the
//! other writes random blocks to a file on a mounted volume and reads every one back. Any
//! difference in the read-back is reported as an [`IntegrityViolation`] and ends the run.

pub mod arena;
pub mod cli;
pub mod harness;
pub mod platform;
pub mod rng;
pub mod volume;
pub mod workers;

pub use arena::MemoryArena;
pub use harness::{Harness, HarnessHandle, HarnessSummary, StopSignal, WorkerKind};
pub use platform::BoardInfo;
pub use volume::{HostFile, HostVolume, VolumeInfo};
pub use workers::{BusSaturationWorker, StorageIntegrityWorker, WorkerCounters};

pub use busprobe_core::{
    BusReport, BusprobeError, BusprobeResult, Config, IntegrityViolation, StorageOutcome,
    StorageReport, StorageStats,
};

use busprobe_core::config::StorageConfig;
use std::path::PathBuf;

/// Mount the configured volume and log its capacity
pub fn mount_volume(config: &Config) -> BusprobeResult<HostVolume> {
    let volume = HostVolume::mount(&config.volume)?
        .with_sync_on_flush(config.storage.sync_on_flush);

    if volume.is_mounted() {
        let info = volume.info()?;
        tracing::info!(
            "disk size total {} kB (used {} bytes)",
            info.total_bytes / 1024,
            info.used_bytes
        );
    }
    Ok(volume)
}

/// Create the zero-filled backing file unless it already exists.
///
/// Returns the path and whether the file was created.
pub fn ensure_backing_file(
    volume: &HostVolume,
    storage: &StorageConfig,
) -> BusprobeResult<(PathBuf, bool)> {
    let path = volume.root().join(&storage.file_name);
    if path.is_file() {
        return Ok((path, false));
    }
    let path = volume.prepare_file(&storage.file_name, storage.backing_size)?;
    Ok((path, true))
}

/// Probe the board, mount the volume and launch both workers
pub fn start(config: Config) -> BusprobeResult<HarnessHandle> {
    let harness = Harness::new(config)?;

    BoardInfo::probe(&harness.config().volume).log_banner();
    let volume = mount_volume(harness.config())?;

    harness.start(volume)
}
