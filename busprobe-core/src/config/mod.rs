//! Configuration types for busprobe

use crate::storage::BLOCK_SIZE;
use crate::BusprobeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub rng: RngConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Mount point of the flash-backed volume (defaults to $BUSPROBE_HOME/data)
    #[serde(default)]
    pub base_path: Option<String>,
    /// Label of the backing partition, checked on mount
    #[serde(default = "default_partition_label")]
    pub partition_label: String,
    /// Partition capacity in bytes
    #[serde(default = "default_partition_size")]
    pub partition_size: u64,
    /// Format the partition when mounting fails
    #[serde(default = "default_format_if_mount_failed")]
    pub format_if_mount_failed: bool,
    /// Grow the recorded partition size up to `partition_size` on mount
    #[serde(default = "default_grow_on_mount")]
    pub grow_on_mount: bool,
    /// Register the volume without mounting it
    #[serde(default)]
    pub dont_mount: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File inside the volume that receives the integrity blocks
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Write/verify iterations per run (0 = run until stopped)
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Size of the zero-filled backing file created by `prepare`
    #[serde(default = "default_backing_size")]
    pub backing_size: u64,
    /// Also sync file data to the device on every flush
    #[serde(default = "default_sync_on_flush")]
    pub sync_on_flush: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Size of the memory arena filled on every pass
    #[serde(default = "default_arena_size")]
    pub arena_size: usize,
    /// Fill passes per run (0 = run until stopped)
    #[serde(default)]
    pub passes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Nominal priority shared by both workers
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Stack size for each worker thread
    #[serde(default = "default_stack_size")]
    pub stack_size: usize,
    /// Yield to the scheduler after every iteration
    #[serde(default = "default_yield_every_iteration")]
    pub yield_every_iteration: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RngConfig {
    /// Fixed seed for replaying a run; seeded from the clock when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

// Default value functions
fn default_partition_label() -> String { "storage".to_string() }
fn default_partition_size() -> u64 { 1024 * 1024 }
fn default_format_if_mount_failed() -> bool { true }
fn default_grow_on_mount() -> bool { true }
fn default_file_name() -> String { "dumpdata.txt".to_string() }
fn default_iterations() -> u64 { 256 }
fn default_backing_size() -> u64 { 300 * 1024 }
fn default_sync_on_flush() -> bool { true }
fn default_arena_size() -> usize { 1024 * 1024 }
fn default_priority() -> u8 { 1 }
fn default_stack_size() -> usize { 64 * 1024 }
fn default_yield_every_iteration() -> bool { true }

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            partition_label: default_partition_label(),
            partition_size: default_partition_size(),
            format_if_mount_failed: default_format_if_mount_failed(),
            grow_on_mount: default_grow_on_mount(),
            dont_mount: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            iterations: default_iterations(),
            backing_size: default_backing_size(),
            sync_on_flush: default_sync_on_flush(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            arena_size: default_arena_size(),
            passes: 0,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            stack_size: default_stack_size(),
            yield_every_iteration: default_yield_every_iteration(),
        }
    }
}

impl VolumeConfig {
    /// Directory the volume is mounted at
    pub fn mount_point(&self) -> PathBuf {
        match &self.base_path {
            Some(path) => PathBuf::from(path),
            None => crate::system::default_data_dir(),
        }
    }
}

impl StorageConfig {
    /// Iteration budget, `None` when the worker runs until stopped
    pub fn iteration_budget(&self) -> Option<u64> {
        (self.iterations > 0).then_some(self.iterations)
    }
}

impl BusConfig {
    /// Pass budget, `None` when the worker runs until stopped
    pub fn pass_budget(&self) -> Option<u64> {
        (self.passes > 0).then_some(self.passes)
    }
}

impl Config {
    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<(), BusprobeError> {
        if self.bus.arena_size == 0 {
            return Err(BusprobeError::Configuration(
                "bus.arena_size must be greater than zero".to_string(),
            ));
        }
        if self.storage.file_name.trim().is_empty() {
            return Err(BusprobeError::Configuration(
                "storage.file_name must not be empty".to_string(),
            ));
        }
        if Path::new(&self.storage.file_name).is_absolute() {
            return Err(BusprobeError::Configuration(format!(
                "storage.file_name must be relative to the volume, got '{}'",
                self.storage.file_name
            )));
        }
        if self.storage.backing_size < BLOCK_SIZE as u64 {
            return Err(BusprobeError::Configuration(format!(
                "storage.backing_size must hold at least one {} byte block",
                BLOCK_SIZE
            )));
        }
        if self.volume.partition_label.trim().is_empty() {
            return Err(BusprobeError::Configuration(
                "volume.partition_label must not be empty".to_string(),
            ));
        }
        if self.scheduler.stack_size < 16 * 1024 {
            return Err(BusprobeError::Configuration(
                "scheduler.stack_size must be at least 16 KiB".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, BusprobeError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| BusprobeError::Configuration(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), BusprobeError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| BusprobeError::Configuration(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Load the config at `explicit`, else the one in $BUSPROBE_HOME, else defaults
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config, BusprobeError> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    let discovered = crate::system::config_path();
    if discovered.is_file() {
        tracing::debug!("Loading config from {}", discovered.display());
        return load_config(discovered);
    }

    Ok(default_config())
}
