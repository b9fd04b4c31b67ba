//! Core utilities and types shared across all busprobe crates

pub mod config;
pub mod error;
pub mod storage;
pub mod system;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, save_config, Config};
pub use error::{BusprobeError, BusprobeResult, IntegrityViolation};

pub use storage::{BlockFile, Volume, BLOCK_SIZE};
pub use types::{BusReport, StorageOutcome, StorageReport, StorageStats};

pub use system::{busprobe_home, config_path, default_data_dir};

/// Version information for the busprobe project
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
