//! Test utilities for the busprobe workspace
//!
//! This crate provides common test helpers, fixtures, and utilities for testing
//! across the busprobe workspace.
//!
//! # Features
//!
//! - **Test Environment**: Isolated `BUSPROBE_HOME` and volume directories with automatic cleanup
//! - **Fault Injection**: `FaultyVolume`/`FaultyFile` doubles that record every file operation
//!   and corrupt, shorten or fail them on demand
//! - **Fixtures**: Zero-filled backing files and deterministic random sources
//! - **Assertions**: Checks on recorded operation sequences and arena contents

pub mod assertions;
pub mod environment;
pub mod fixtures;
pub mod mock;

// Re-export commonly used items
pub use environment::TestEnvironment;
pub use fixtures::{nonzero_rng, seeded_rng, zero_filled_file, NonZeroBytes, TEST_SEED};
pub use mock::{Fault, FaultPlan, FaultyFile, FaultyVolume, FileOp, FileState};

// Re-export test dependencies for convenience
pub use anyhow::{Context, Result};
pub use tempfile;

/// Initialize test logging (call once per test module)
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BUSPROBE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Run a test with a clean environment
///
/// # Example
/// ```rust
/// use busprobe_test::with_test_env;
///
/// with_test_env(|env| {
///     let file = env.create_backing_file("dumpdata.txt", 4096)?;
///     assert!(file.exists());
///     Ok(())
/// }).unwrap();
/// ```
pub fn with_test_env<F, R>(f: F) -> Result<R>
where
    F: FnOnce(&TestEnvironment) -> Result<R>,
{
    let env = TestEnvironment::new()?;
    // Cleanup happens automatically via Drop
    f(&env)
}
