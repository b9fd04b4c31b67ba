use crate::cli::output::*;
use busprobe_core::{BusprobeError, Config};
use clap::Args;

#[derive(Args)]
pub struct PrepareArgs {
    /// File to create on the volume; defaults to storage.file_name
    #[arg(long)]
    pub name: Option<String>,

    /// Size in bytes; defaults to storage.backing_size
    #[arg(long)]
    pub size: Option<u64>,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

pub fn run(args: PrepareArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(name) = args.name {
        config.storage.file_name = name;
    }
    if let Some(size) = args.size {
        config.storage.backing_size = size;
    }
    config.validate()?;

    let volume = crate::mount_volume(&config)?;
    if !volume.is_mounted() {
        return Err(BusprobeError::Mount(format!(
            "volume '{}' is configured with dont_mount",
            volume.label()
        ))
        .into());
    }

    let target = volume.root().join(&config.storage.file_name);
    if target.exists() && !args.force {
        warning(&format!(
            "{} already exists (use --force to recreate it)",
            target.display()
        ));
        return Ok(());
    }

    let path = volume.prepare_file(&config.storage.file_name, config.storage.backing_size)?;
    success(&format!(
        "Created {} ({})",
        path.display(),
        format_size(config.storage.backing_size)
    ));
    Ok(())
}
