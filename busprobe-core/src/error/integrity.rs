//! Integrity violation details

use serde::{Deserialize, Serialize};
use std::fmt;

/// A read-back block that did not match what was written at the same offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
    /// Zero-based iteration on which the mismatch was observed
    pub iteration: u64,
    /// File offset the block was written to and read back from
    pub offset: u64,
    /// Index of the first differing byte inside the block
    pub first_mismatch: usize,
    /// Byte that was written at `first_mismatch`
    pub expected: u8,
    /// Byte that was read back at `first_mismatch`
    pub actual: u8,
    /// Total number of differing bytes in the block
    pub differing_bytes: usize,
}

impl IntegrityViolation {
    pub fn new(
        iteration: u64,
        offset: u64,
        first_mismatch: usize,
        expected: u8,
        actual: u8,
        differing_bytes: usize,
    ) -> Self {
        Self {
            iteration,
            offset,
            first_mismatch,
            expected,
            actual,
            differing_bytes,
        }
    }

    /// Compare a written block against its read-back copy.
    ///
    /// Returns `None` when both are identical.
    pub fn compare(iteration: u64, offset: u64, written: &[u8], read: &[u8]) -> Option<Self> {
        let mut first = None;
        let mut differing = 0usize;

        for (index, (w, r)) in written.iter().zip(read.iter()).enumerate() {
            if w != r {
                differing += 1;
                if first.is_none() {
                    first = Some((index, *w, *r));
                }
            }
        }

        // Length differences count as differing bytes past the common prefix
        let len_diff = written.len().abs_diff(read.len());
        if len_diff > 0 && first.is_none() {
            let index = written.len().min(read.len());
            let expected = written.get(index).copied().unwrap_or(0);
            let actual = read.get(index).copied().unwrap_or(0);
            first = Some((index, expected, actual));
        }
        differing += len_diff;

        first.map(|(index, expected, actual)| {
            Self::new(iteration, offset, index, expected, actual, differing)
        })
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iteration {} at offset {}: byte {} expected 0x{:02X}, read 0x{:02X} ({} bytes differ)",
            self.iteration,
            self.offset,
            self.first_mismatch,
            self.expected,
            self.actual,
            self.differing_bytes
        )
    }
}

impl std::error::Error for IntegrityViolation {}
