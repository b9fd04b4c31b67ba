//! Run reports for the two workers

use crate::error::IntegrityViolation;
use crate::storage::BLOCK_SIZE;
use serde::{Deserialize, Serialize};

/// How a storage integrity run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StorageOutcome {
    /// The iteration budget was exhausted without a mismatch
    CompletedFully,
    /// A read-back block differed from the written block; the run stopped there
    StoppedOnMismatch(IntegrityViolation),
    /// The target file could not be opened; no iteration ran
    OpenFailed { reason: String },
    /// The stop signal was raised before the budget ran out
    Stopped,
}

impl StorageOutcome {
    /// True unless the run detected corruption or never started
    pub fn is_clean(&self) -> bool {
        matches!(self, StorageOutcome::CompletedFully | StorageOutcome::Stopped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StorageOutcome::CompletedFully => "completed",
            StorageOutcome::StoppedOnMismatch(_) => "mismatch",
            StorageOutcome::OpenFailed { .. } => "open failed",
            StorageOutcome::Stopped => "stopped",
        }
    }
}

/// Per-run counters of the storage integrity worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Iterations that ran to their end (transient failures included, mismatch excluded)
    pub iterations: u64,
    /// Blocks whose read-back matched
    pub verified: u64,
    /// Successful flushes
    pub flushes: u64,
    pub write_failures: u64,
    pub seek_failures: u64,
    pub read_failures: u64,
    pub flush_failures: u64,
}

impl StorageStats {
    /// Bytes reported as written, one block per completed iteration
    pub fn bytes_written(&self) -> u64 {
        self.iterations * BLOCK_SIZE as u64
    }

    /// Bytes that were written and verified
    pub fn bytes_verified(&self) -> u64 {
        self.verified * BLOCK_SIZE as u64
    }

    pub fn transient_failures(&self) -> u64 {
        self.write_failures + self.seek_failures + self.read_failures + self.flush_failures
    }
}

/// Result of one storage integrity run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageReport {
    pub outcome: StorageOutcome,
    pub stats: StorageStats,
}

impl StorageReport {
    pub fn open_failed(reason: impl Into<String>) -> Self {
        Self {
            outcome: StorageOutcome::OpenFailed { reason: reason.into() },
            stats: StorageStats::default(),
        }
    }

    /// The violation that stopped the run, if any
    pub fn violation(&self) -> Option<&IntegrityViolation> {
        match &self.outcome {
            StorageOutcome::StoppedOnMismatch(v) => Some(v),
            _ => None,
        }
    }
}

/// Result of one bus saturation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusReport {
    /// Completed fill passes
    pub passes: u64,
    /// Arena size in bytes
    pub arena_size: usize,
    /// Fill byte of the most recent pass
    pub last_fill: Option<u8>,
}

impl BusReport {
    /// Total bytes pushed over the bus
    pub fn bytes_filled(&self) -> u64 {
        self.passes * self.arena_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bytes_written_counts_completed_iterations() {
        let stats = StorageStats {
            iterations: 256,
            verified: 250,
            flushes: 250,
            write_failures: 6,
            ..Default::default()
        };

        assert_eq!(stats.bytes_written(), 256 * 1024);
        assert_eq!(stats.bytes_verified(), 250 * 1024);
        assert_eq!(stats.transient_failures(), 6);
    }

    #[test]
    fn test_outcome_cleanliness() {
        assert!(StorageOutcome::CompletedFully.is_clean());
        assert!(StorageOutcome::Stopped.is_clean());
        assert!(!StorageOutcome::OpenFailed { reason: "missing".into() }.is_clean());

        let violation = IntegrityViolation::new(0, 0, 0, 1, 2, 1);
        assert!(!StorageOutcome::StoppedOnMismatch(violation).is_clean());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let report = StorageReport::open_failed("No such file or directory");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["outcome"]["status"], "open_failed");
        assert_eq!(json["outcome"]["reason"], "No such file or directory");
        assert_eq!(json["stats"]["iterations"], 0);
    }

    #[test]
    fn test_bus_report_bytes() {
        let report = BusReport { passes: 3, arena_size: 1024 * 1024, last_fill: Some(0x2A) };
        assert_eq!(report.bytes_filled(), 3 * 1024 * 1024);
    }
}
