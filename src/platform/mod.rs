//! Board information and the start-up banner

use busprobe_core::config::VolumeConfig;
use serde::Serialize;
use sysinfo::System;

/// What the harness knows about the machine it runs on
#[derive(Debug, Clone, Serialize)]
pub struct BoardInfo {
    /// CPU brand string, or the architecture when the brand is unknown
    pub chip: String,
    pub arch: &'static str,
    pub cores: usize,
    /// Capacity of the volume standing in for flash
    pub flash_size: u64,
    /// Whether the volume lives on the same device as the process
    pub embedded_flash: bool,
    pub total_memory: u64,
    pub free_memory: u64,
}

impl BoardInfo {
    /// Query the host for CPU and memory details
    pub fn probe(volume: &VolumeConfig) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_all();

        let brand = system
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty());

        Self {
            chip: brand.unwrap_or_else(|| std::env::consts::ARCH.to_string()),
            arch: std::env::consts::ARCH,
            cores: system.cpus().len().max(1),
            flash_size: volume.partition_size,
            embedded_flash: volume.base_path.is_none(),
            total_memory: system.total_memory(),
            free_memory: system.free_memory(),
        }
    }

    /// The banner lines printed before the workers start
    pub fn banner(&self) -> Vec<String> {
        vec![
            format!("{} ({}), {} cores", self.chip, self.arch, self.cores),
            format!(
                "{}MB {} flash",
                self.flash_size / (1024 * 1024),
                if self.embedded_flash { "embedded" } else { "external" }
            ),
            format!("Free heap: {} bytes", self.free_memory),
            "Now we are starting the bus stress test ...".to_string(),
        ]
    }

    pub fn log_banner(&self) {
        for line in self.banner() {
            tracing::info!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_reports_configured_flash() {
        let volume = VolumeConfig {
            partition_size: 4 * 1024 * 1024,
            ..Default::default()
        };
        let info = BoardInfo::probe(&volume);

        assert_eq!(info.flash_size, 4 * 1024 * 1024);
        assert!(info.cores >= 1);
        assert!(!info.chip.is_empty());
    }

    #[test]
    fn test_banner_lines() {
        let info = BoardInfo {
            chip: "test-cpu".to_string(),
            arch: "x86_64",
            cores: 2,
            flash_size: 2 * 1024 * 1024,
            embedded_flash: false,
            total_memory: 1 << 30,
            free_memory: 12345,
        };
        let banner = info.banner();

        assert_eq!(banner.len(), 4);
        assert_eq!(banner[1], "2MB external flash");
        assert_eq!(banner[2], "Free heap: 12345 bytes");
        assert!(banner[3].starts_with("Now we are starting"));
    }
}
