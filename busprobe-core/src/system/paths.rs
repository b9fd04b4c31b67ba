use std::path::PathBuf;

/// Get the busprobe home directory
/// Checks BUSPROBE_HOME environment variable, falls back to ${HOME}/.busprobe
///
/// Resolved on every call.
pub fn busprobe_home() -> PathBuf {
    if let Ok(path) = std::env::var("BUSPROBE_HOME") {
        PathBuf::from(path)
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| {
            std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string())
        });
        PathBuf::from(home).join(".busprobe")
    }
}

/// Default mount point for the host-backed volume
/// Checks BUSPROBE_DATA_DIR environment variable, falls back to BUSPROBE_HOME/data
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var("BUSPROBE_DATA_DIR") {
        PathBuf::from(path)
    } else {
        busprobe_home().join("data")
    }
}

/// Location of the auto-discovered config file
pub fn config_path() -> PathBuf {
    busprobe_home().join("config.toml")
}

/// Describe the resolved paths, one `(label, path)` pair per line
pub fn describe_paths() -> Vec<(&'static str, PathBuf)> {
    vec![
        ("home", busprobe_home()),
        ("data", default_data_dir()),
        ("config", config_path()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_home_from_env() {
        let saved = std::env::var("BUSPROBE_HOME").ok();
        std::env::set_var("BUSPROBE_HOME", "/opt/busprobe");

        assert_eq!(busprobe_home(), PathBuf::from("/opt/busprobe"));
        assert_eq!(config_path(), PathBuf::from("/opt/busprobe/config.toml"));

        match saved {
            Some(v) => std::env::set_var("BUSPROBE_HOME", v),
            None => std::env::remove_var("BUSPROBE_HOME"),
        }
    }

    #[test]
    #[serial]
    fn test_data_dir_override() {
        let saved_home = std::env::var("BUSPROBE_HOME").ok();
        let saved_data = std::env::var("BUSPROBE_DATA_DIR").ok();
        std::env::set_var("BUSPROBE_HOME", "/opt/busprobe");
        std::env::remove_var("BUSPROBE_DATA_DIR");

        assert_eq!(default_data_dir(), PathBuf::from("/opt/busprobe/data"));

        std::env::set_var("BUSPROBE_DATA_DIR", "/mnt/flash");
        assert_eq!(default_data_dir(), PathBuf::from("/mnt/flash"));

        for (key, value) in [("BUSPROBE_HOME", saved_home), ("BUSPROBE_DATA_DIR", saved_data)] {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}
