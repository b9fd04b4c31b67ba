//! Directory-backed volumes for running the integrity worker on a host
//!
//! A [`HostVolume`] stands in for the flash partition: a directory with a small label file
//! acting as its superblock. Mount, format, grow and register-only follow the flash
//! filesystem's registration options.

pub mod host;

pub use host::{HostFile, HostVolume, VolumeInfo, VolumeLabel, LABEL_FILE};
