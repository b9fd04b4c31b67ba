//! Core error types for busprobe

pub mod integrity;

use thiserror::Error;
pub use integrity::IntegrityViolation;

/// Main error type for busprobe operations
#[derive(Error, Debug)]
pub enum BusprobeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Mount error: {0}")]
    Mount(String),

    #[error("Open error: {0}")]
    Open(String),

    #[error("Integrity violation: {0}")]
    Integrity(IntegrityViolation),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for busprobe operations
pub type BusprobeResult<T> = Result<T, BusprobeError>;

impl From<IntegrityViolation> for BusprobeError {
    fn from(violation: IntegrityViolation) -> Self {
        BusprobeError::Integrity(violation)
    }
}

impl From<toml::de::Error> for BusprobeError {
    fn from(err: toml::de::Error) -> Self {
        BusprobeError::Configuration(format!("Failed to parse config: {}", err))
    }
}

impl From<serde_json::Error> for BusprobeError {
    fn from(err: serde_json::Error) -> Self {
        BusprobeError::Other(format!("JSON error: {}", err))
    }
}

impl From<anyhow::Error> for BusprobeError {
    fn from(err: anyhow::Error) -> Self {
        BusprobeError::Other(err.to_string())
    }
}

impl BusprobeError {
    /// Whether this error is the positive result the harness exists to find
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, BusprobeError::Integrity(_))
    }
}
