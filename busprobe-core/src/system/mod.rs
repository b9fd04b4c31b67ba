pub mod paths;

// Re-export commonly used functions
pub use paths::{busprobe_home, config_path, default_data_dir, describe_paths};
