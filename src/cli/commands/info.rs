use crate::cli::commands::print_json;
use crate::cli::output::*;
use crate::platform::BoardInfo;
use crate::volume::VolumeInfo;
use busprobe_core::Config;
use clap::Args;
use serde::Serialize;

#[derive(Args)]
pub struct InfoArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct InfoReport {
    board: BoardInfo,
    volume: Option<VolumeInfo>,
    paths: Vec<(&'static str, String)>,
}

pub fn run(args: InfoArgs, config: Config) -> anyhow::Result<()> {
    let board = BoardInfo::probe(&config.volume);
    let volume = crate::mount_volume(&config)?;
    let volume_info = if volume.is_mounted() {
        Some(volume.info()?)
    } else {
        None
    };

    let paths = busprobe_core::system::describe_paths()
        .into_iter()
        .map(|(name, path)| (name, path.display().to_string()))
        .collect::<Vec<_>>();

    if args.json {
        return print_json(&InfoReport {
            board,
            volume: volume_info,
            paths,
        });
    }

    section_header_with_line("Board");
    tree_item(false, "Chip", Some(&board.chip));
    tree_item(false, "Cores", Some(&board.cores.to_string()));
    tree_item(false, "Memory", Some(&format_size(board.total_memory)));
    tree_item(true, "Free heap", Some(&format_size(board.free_memory)));

    section_header_with_line("Volume");
    match &volume_info {
        Some(info) => {
            tree_item(false, "Label", Some(&info.label));
            tree_item(false, "Mount point", Some(&info.mount_point.display().to_string()));
            tree_item(false, "Total", Some(&format_size(info.total_bytes)));
            tree_item(false, "Used", Some(&format_size(info.used_bytes)));
            tree_item(true, "Free", Some(&format_size(info.free_bytes())));
        }
        None => warning(&format!(
            "Volume '{}' registered at {} but not mounted",
            volume.label(),
            volume.root().display()
        )),
    }

    section_header_with_line("Paths");
    for (i, (name, path)) in paths.iter().enumerate() {
        tree_item(i == paths.len() - 1, name, Some(path.as_str()));
    }
    Ok(())
}
