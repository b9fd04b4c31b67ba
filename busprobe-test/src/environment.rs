//! Test environment management
//!
//! Provides isolated test environments with automatic cleanup using RAII.

use anyhow::{Context, Result};
use busprobe_core::config::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated test environment with automatic cleanup
///
/// Exports `BUSPROBE_HOME` and `BUSPROBE_DATA_DIR` for its lifetime and restores the previous
/// values on drop. Tests that create one must run under `#[serial]`.
pub struct TestEnvironment {
    /// Root temporary directory, removed on drop
    _temp_dir: TempDir,
    root_path: PathBuf,
    /// Saved environment variables for restoration
    saved_env: HashMap<String, Option<String>>,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir =
            TempDir::with_prefix("busprobe-test").context("Failed to create temporary directory")?;
        let root_path = temp_dir.path().to_path_buf();

        // The volume directory is left to the code under test so mount/format paths run
        let mut env = Self {
            _temp_dir: temp_dir,
            root_path,
            saved_env: HashMap::new(),
        };
        env.setup_environment();
        Ok(env)
    }

    fn setup_environment(&mut self) {
        let home_path = self.root_path.to_string_lossy().to_string();
        let data_path = self.volume_dir().to_string_lossy().to_string();

        for (key, value) in [("BUSPROBE_HOME", home_path), ("BUSPROBE_DATA_DIR", data_path)] {
            self.saved_env.insert(key.to_string(), std::env::var(key).ok());
            std::env::set_var(key, value);
        }
    }

    /// Get the root path of the test environment
    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Mount point used for the host-backed volume
    pub fn volume_dir(&self) -> PathBuf {
        self.root_path.join("data")
    }

    /// Config pointing every path at this environment
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.volume.base_path = Some(self.volume_dir().to_string_lossy().to_string());
        config
    }

    /// Create a zero-filled file inside the volume directory
    pub fn create_backing_file(&self, name: &str, size: u64) -> Result<PathBuf> {
        crate::fixtures::zero_filled_file(&self.volume_dir(), name, size)
    }

    /// Write a file in the test environment
    pub fn write_file(&self, path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
        let full_path = self.root_path.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full_path, content)?;
        Ok(())
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        for (key, value) in &self.saved_env {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_creation() {
        let env = TestEnvironment::new().unwrap();
        assert!(env.root().exists());
        assert!(!env.volume_dir().exists());
        assert_eq!(
            std::env::var("BUSPROBE_HOME").unwrap(),
            env.root().to_string_lossy()
        );
    }

    #[test]
    #[serial]
    fn test_environment_isolation() {
        let env1 = TestEnvironment::new().unwrap();
        let env2 = TestEnvironment::new().unwrap();

        assert_ne!(env1.root(), env2.root());

        env1.write_file("test.txt", b"env1").unwrap();
        assert!(!env2.root().join("test.txt").exists());
    }

    #[test]
    #[serial]
    fn test_environment_cleanup() {
        let path = {
            let env = TestEnvironment::new().unwrap();
            let path = env.root().to_path_buf();
            assert!(path.exists());
            path
        };

        assert!(!path.exists());
    }

    #[test]
    #[serial]
    fn test_config_points_at_volume_dir() {
        let env = TestEnvironment::new().unwrap();
        let config = env.config();
        assert_eq!(config.volume.mount_point(), env.volume_dir());
    }

    #[test]
    #[serial]
    fn test_backing_file_is_zero_filled() {
        let env = TestEnvironment::new().unwrap();
        let path = env.create_backing_file("dumpdata.txt", 3000).unwrap();

        let data = std::fs::read(path).unwrap();
        assert_eq!(data.len(), 3000);
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    #[serial]
    fn test_environment_restores_variables() {
        std::env::set_var("BUSPROBE_HOME", "/outer");
        {
            let env = TestEnvironment::new().unwrap();
            assert_eq!(
                std::env::var("BUSPROBE_DATA_DIR").unwrap(),
                env.volume_dir().to_string_lossy()
            );
        }
        assert_eq!(std::env::var("BUSPROBE_HOME").unwrap(), "/outer");
        std::env::remove_var("BUSPROBE_HOME");
    }
}
