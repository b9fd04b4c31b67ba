use busprobe_core::config::VolumeConfig;
use busprobe_core::{BlockFile, BusprobeError, BusprobeResult, Volume};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Name of the superblock file inside the mount directory
pub const LABEL_FILE: &str = ".busprobe-volume";

/// Superblock of a host volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLabel {
    pub label: String,
    pub size: u64,
    pub formatted_at: DateTime<Utc>,
}

/// Capacity and usage of a mounted volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeInfo {
    pub label: String,
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl VolumeInfo {
    pub fn free_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MountState {
    Registered,
    Mounted,
}

#[derive(Debug)]
pub struct HostVolume {
    config: VolumeConfig,
    root: PathBuf,
    state: MountState,
    sync_on_flush: bool,
}

impl HostVolume {
    /// Register the volume without touching the disk
    pub fn register(config: &VolumeConfig) -> Self {
        Self {
            config: config.clone(),
            root: config.mount_point(),
            state: MountState::Registered,
            sync_on_flush: true,
        }
    }

    /// Register and mount according to the config's mount policy.
    ///
    /// With `dont_mount` set the volume is only registered.
    pub fn mount(config: &VolumeConfig) -> BusprobeResult<Self> {
        let mut volume = Self::register(config);
        if config.dont_mount {
            tracing::info!(
                "Registered volume '{}' at {} without mounting",
                config.partition_label,
                volume.root.display()
            );
            return Ok(volume);
        }

        volume.mount_registered()?;
        Ok(volume)
    }

    fn mount_registered(&mut self) -> BusprobeResult<()> {
        let mut label = match self.read_label() {
            Ok(label) if label.label == self.config.partition_label => label,
            found => {
                let reason = match found {
                    Ok(other) => format!("label is '{}'", other.label),
                    Err(e) => e.to_string(),
                };
                if !self.config.format_if_mount_failed {
                    return Err(BusprobeError::Mount(format!(
                        "failed to mount volume '{}' at {}: {}",
                        self.config.partition_label,
                        self.root.display(),
                        reason
                    )));
                }
                tracing::warn!(
                    "Mounting '{}' failed ({}), formatting",
                    self.config.partition_label,
                    reason
                );
                self.format()?
            }
        };

        if self.config.grow_on_mount && label.size < self.config.partition_size {
            tracing::info!(
                "Growing volume '{}' from {} to {} bytes",
                label.label,
                label.size,
                self.config.partition_size
            );
            label.size = self.config.partition_size;
            self.write_label(&label)?;
        }

        self.state = MountState::Mounted;
        tracing::debug!("Mounted '{}' at {}", label.label, self.root.display());
        Ok(())
    }

    /// Erase the volume and write a fresh label.
    ///
    /// Only directories that are empty or already carry a label are formatted.
    pub fn format(&self) -> BusprobeResult<VolumeLabel> {
        fs::create_dir_all(&self.root)?;

        let labelled = self.root.join(LABEL_FILE).is_file();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !labelled {
                return Err(BusprobeError::Mount(format!(
                    "refusing to format {}: directory is not empty and has no volume label",
                    self.root.display()
                )));
            }
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }

        let label = VolumeLabel {
            label: self.config.partition_label.clone(),
            size: self.config.partition_size,
            formatted_at: Utc::now(),
        };
        self.write_label(&label)?;
        Ok(label)
    }

    pub fn with_sync_on_flush(mut self, sync_on_flush: bool) -> Self {
        self.sync_on_flush = sync_on_flush;
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.state == MountState::Mounted
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn label(&self) -> &str {
        &self.config.partition_label
    }

    /// Total size from the label and bytes used by regular files
    pub fn info(&self) -> BusprobeResult<VolumeInfo> {
        self.ensure_mounted()?;
        let label = self.read_label()?;

        let mut used_bytes = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_name() == LABEL_FILE {
                continue;
            }
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                used_bytes += metadata.len();
            }
        }

        Ok(VolumeInfo {
            label: label.label,
            mount_point: self.root.clone(),
            total_bytes: label.size,
            used_bytes,
        })
    }

    /// Create (or truncate) `name` as `size` zero bytes
    pub fn prepare_file(&self, name: &str, size: u64) -> BusprobeResult<PathBuf> {
        self.ensure_mounted()?;
        let path = self.root.join(name);
        let file = File::create(&path)?;
        file.set_len(size)?;
        file.sync_all()?;
        tracing::info!("Prepared {} ({} bytes)", path.display(), size);
        Ok(path)
    }

    fn ensure_mounted(&self) -> BusprobeResult<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(BusprobeError::Mount(format!(
                "volume '{}' is registered but not mounted",
                self.config.partition_label
            )))
        }
    }

    fn read_label(&self) -> BusprobeResult<VolumeLabel> {
        let contents = fs::read_to_string(self.root.join(LABEL_FILE))?;
        let label = toml::from_str(&contents)
            .map_err(|e| BusprobeError::Mount(format!("corrupt volume label: {}", e)))?;
        Ok(label)
    }

    fn write_label(&self, label: &VolumeLabel) -> BusprobeResult<()> {
        let contents = toml::to_string_pretty(label)
            .map_err(|e| BusprobeError::Other(format!("failed to serialize label: {}", e)))?;
        fs::write(self.root.join(LABEL_FILE), contents)?;
        Ok(())
    }
}

impl Volume for HostVolume {
    type File = HostFile;

    fn open_for_update(&self, path: &Path) -> io::Result<HostFile> {
        if !self.is_mounted() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("volume '{}' is not mounted", self.config.partition_label),
            ));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.root.join(path))?;

        Ok(HostFile {
            file: Some(file),
            sync_on_flush: self.sync_on_flush,
        })
    }
}

/// Open file on a [`HostVolume`]
#[derive(Debug)]
pub struct HostFile {
    file: Option<File>,
    sync_on_flush: bool,
}

impl HostFile {
    fn handle(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "file handle already closed"))
    }
}

impl BlockFile for HostFile {
    fn tell(&mut self) -> io::Result<u64> {
        self.handle()?.stream_position()
    }

    fn write_block(&mut self, block: &[u8]) -> io::Result<usize> {
        let file = self.handle()?;
        let mut written = 0;
        while written < block.len() {
            match file.write(&block[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if written == 0 => return Err(e),
                Err(_) => break,
            }
        }
        Ok(written)
    }

    fn seek_to(&mut self, pos: u64) -> io::Result<()> {
        self.handle()?.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn read_block(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let file = self.handle()?;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if filled == 0 => return Err(e),
                Err(_) => break,
            }
        }
        Ok(filled)
    }

    fn flush(&mut self) -> io::Result<()> {
        let sync = self.sync_on_flush;
        let file = self.handle()?;
        file.flush()?;
        if sync {
            file.sync_data()?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(file) => file.sync_all(),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "file handle already closed",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use busprobe_core::BLOCK_SIZE;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn volume_config(dir: &Path) -> VolumeConfig {
        VolumeConfig {
            base_path: Some(dir.join("flash").to_string_lossy().into_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn test_mount_formats_fresh_directory() {
        let temp = TempDir::new().unwrap();
        let volume = HostVolume::mount(&volume_config(temp.path())).unwrap();

        assert!(volume.is_mounted());
        assert!(volume.root().join(LABEL_FILE).is_file());

        let info = volume.info().unwrap();
        assert_eq!(info.label, "storage");
        assert_eq!(info.total_bytes, 1024 * 1024);
        assert_eq!(info.used_bytes, 0);
    }

    #[test]
    fn test_remount_keeps_files() {
        let temp = TempDir::new().unwrap();
        let config = volume_config(temp.path());

        let volume = HostVolume::mount(&config).unwrap();
        volume.prepare_file("dumpdata.txt", 4096).unwrap();

        let again = HostVolume::mount(&config).unwrap();
        assert_eq!(again.info().unwrap().used_bytes, 4096);
    }

    #[test]
    fn test_label_mismatch_without_format_fails() {
        let temp = TempDir::new().unwrap();
        let config = volume_config(temp.path());
        HostVolume::mount(&config).unwrap();

        let other = VolumeConfig {
            partition_label: "spiffs".to_string(),
            format_if_mount_failed: false,
            ..config.clone()
        };
        let err = HostVolume::mount(&other).unwrap_err();
        assert!(matches!(err, BusprobeError::Mount(_)));
    }

    #[test]
    fn test_label_mismatch_with_format_erases_files() {
        let temp = TempDir::new().unwrap();
        let config = volume_config(temp.path());
        HostVolume::mount(&config)
            .unwrap()
            .prepare_file("old.bin", 2048)
            .unwrap();

        let other = VolumeConfig {
            partition_label: "spiffs".to_string(),
            ..config
        };
        let volume = HostVolume::mount(&other).unwrap();
        let info = volume.info().unwrap();
        assert_eq!(info.label, "spiffs");
        assert_eq!(info.used_bytes, 0);
    }

    #[test]
    fn test_format_refuses_unlabelled_directory() {
        let temp = TempDir::new().unwrap();
        let config = volume_config(temp.path());
        fs::create_dir_all(config.mount_point()).unwrap();
        fs::write(config.mount_point().join("precious.txt"), b"keep").unwrap();

        assert!(HostVolume::mount(&config).is_err());
        assert!(config.mount_point().join("precious.txt").exists());
    }

    #[test]
    fn test_format_erases_files_and_directories() {
        let temp = TempDir::new().unwrap();
        let volume = HostVolume::mount(&volume_config(temp.path())).unwrap();
        let nested = volume.root().join("logs").join("old");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("boot.txt"), b"stale").unwrap();
        fs::write(volume.root().join("dumpdata.txt"), b"stale").unwrap();

        volume.format().unwrap();

        let left: Vec<_> = fs::read_dir(volume.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from(LABEL_FILE)]);
    }

    #[test]
    fn test_grow_on_mount_raises_size() {
        let temp = TempDir::new().unwrap();
        let small = VolumeConfig {
            partition_size: 64 * 1024,
            ..volume_config(temp.path())
        };
        HostVolume::mount(&small).unwrap();

        let large = VolumeConfig {
            partition_size: 512 * 1024,
            ..small.clone()
        };
        assert_eq!(HostVolume::mount(&large).unwrap().info().unwrap().total_bytes, 512 * 1024);

        let fixed = VolumeConfig {
            partition_size: 2 * 1024 * 1024,
            grow_on_mount: false,
            ..small
        };
        assert_eq!(HostVolume::mount(&fixed).unwrap().info().unwrap().total_bytes, 512 * 1024);
    }

    #[test]
    fn test_dont_mount_registers_only() {
        let temp = TempDir::new().unwrap();
        let config = VolumeConfig {
            dont_mount: true,
            ..volume_config(temp.path())
        };

        let volume = HostVolume::mount(&config).unwrap();
        assert!(!volume.is_mounted());
        assert!(!config.mount_point().exists());

        let err = volume.open_for_update(Path::new("dumpdata.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_open_never_creates() {
        let temp = TempDir::new().unwrap();
        let volume = HostVolume::mount(&volume_config(temp.path())).unwrap();

        let err = volume.open_for_update(Path::new("missing.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!volume.root().join("missing.txt").exists());
    }

    #[test]
    fn test_prepare_file_is_zero_filled() {
        let temp = TempDir::new().unwrap();
        let volume = HostVolume::mount(&volume_config(temp.path())).unwrap();

        let path = volume.prepare_file("dumpdata.txt", 300 * 1024).unwrap();
        let bytes = fs::read(path).unwrap();
        assert_eq!(bytes.len(), 300 * 1024);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_host_file_write_seek_read() {
        let temp = TempDir::new().unwrap();
        let volume = HostVolume::mount(&volume_config(temp.path()))
            .unwrap()
            .with_sync_on_flush(false);
        volume.prepare_file("dumpdata.txt", 4096).unwrap();

        let mut file = volume.open_for_update(Path::new("dumpdata.txt")).unwrap();
        let block = [0xA5u8; BLOCK_SIZE];

        file.seek_to(1024).unwrap();
        let pos = file.tell().unwrap();
        assert_eq!(file.write_block(&block).unwrap(), BLOCK_SIZE);
        assert_eq!(file.tell().unwrap(), pos + BLOCK_SIZE as u64);

        file.seek_to(pos).unwrap();
        let mut readback = [0u8; BLOCK_SIZE];
        assert_eq!(file.read_block(&mut readback).unwrap(), BLOCK_SIZE);
        assert_eq!(readback, block);
        file.flush().unwrap();
        file.close().unwrap();
    }

    #[test]
    fn test_read_past_end_is_short() {
        let temp = TempDir::new().unwrap();
        let volume = HostVolume::mount(&volume_config(temp.path())).unwrap();
        volume.prepare_file("tiny.bin", 100).unwrap();

        let mut file = volume.open_for_update(Path::new("tiny.bin")).unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(file.read_block(&mut buf).unwrap(), 100);
    }

    #[test]
    fn test_closed_handle_rejects_io() {
        let temp = TempDir::new().unwrap();
        let volume = HostVolume::mount(&volume_config(temp.path())).unwrap();
        volume.prepare_file("dumpdata.txt", 1024).unwrap();

        let mut file = volume.open_for_update(Path::new("dumpdata.txt")).unwrap();
        file.close().unwrap();

        assert_eq!(file.tell().unwrap_err().kind(), io::ErrorKind::NotConnected);
        assert_eq!(file.close().unwrap_err().kind(), io::ErrorKind::NotConnected);
    }
}
