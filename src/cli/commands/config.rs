use crate::cli::output::*;
use busprobe_core::config::{default_config, save_config};
use busprobe_core::Config;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write a default config file here instead of printing
    #[arg(long, value_name = "FILE")]
    pub write: Option<PathBuf>,

    /// Overwrite an existing file when writing
    #[arg(short, long)]
    pub force: bool,
}

pub fn run(args: ConfigArgs, config: Config) -> anyhow::Result<()> {
    match args.write {
        Some(path) => {
            if path.exists() && !args.force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            save_config(&path, &default_config())?;
            success(&format!("Wrote default config to {}", path.display()));
        }
        None => {
            config.validate()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
