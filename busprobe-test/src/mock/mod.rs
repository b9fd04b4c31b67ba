//! Mock implementations for testing
//!
//! Provides an in-memory, fault-injecting implementation of the filesystem collaborator.

mod faulty_file;

pub use faulty_file::{Fault, FaultPlan, FaultyFile, FaultyVolume, FileOp, FileState};
