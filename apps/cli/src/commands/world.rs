use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hostops_core::presets::PRESETS;
use hostops_core::progress::format_size;
use hostops_core::properties::read_remote_properties;
use hostops_core::{RegenerateRequest, RegenerateWorkflow, RemoteLayout, WorldDownloadPlan};

use crate::commands::{connect_remote, panel};
use crate::config::Settings;
use crate::ui::{BarSink, TerminalPrompter, is_interactive, print_summary, print_table};

#[derive(Args)]
pub struct RegenerateArgs {
    /// Preset key, see `hostops presets`.
    preset: Option<String>,
    /// World seed; blank for random.
    seed: Option<String>,
}

#[derive(Args)]
pub struct DownloadArgs {
    /// Destination directory; defaults to the local server directory.
    path: Option<PathBuf>,
    /// Replace local folders without copying them aside first.
    #[arg(long)]
    no_backup: bool,
}

pub fn regenerate(
    settings: &Settings,
    prompter: &mut TerminalPrompter,
    args: RegenerateArgs,
) -> Result<()> {
    let seed = match args.seed {
        Some(seed) => seed.trim().to_string(),
        None if !prompter.assume_yes() && is_interactive() => prompter
            .input("Seed (blank for random)", "")?
            .trim()
            .to_string(),
        None => String::new(),
    };
    let request = RegenerateRequest {
        preset: args.preset,
        seed,
    };

    let lifecycle = panel(settings)?;
    let session = connect_remote(settings)?;
    let layout = RemoteLayout::default();
    let report = RegenerateWorkflow::new(&session, &lifecycle, &layout)
        .run(&request, prompter)
        .context("Regeneration failed")?;

    println!(
        "World regenerating as {} ({}), seed {}.",
        report.preset.name,
        report.preset.short_type(),
        if report.seed.is_empty() { "random" } else { report.seed.as_str() }
    );
    println!("Start signal sent; the new world is generated on first boot.");
    Ok(())
}

pub fn presets() -> Result<()> {
    let rows = PRESETS
        .iter()
        .map(|preset| {
            vec![
                preset.key.to_string(),
                preset.name.to_string(),
                preset.short_type().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["KEY", "NAME", "TYPE"], &rows);
    Ok(())
}

pub fn download(
    settings: &Settings,
    prompter: &mut TerminalPrompter,
    args: DownloadArgs,
) -> Result<()> {
    let destination = args.path.unwrap_or_else(|| settings.local_server_dir.clone());
    let session = connect_remote(settings)?;
    let layout = RemoteLayout::default();

    let plan = WorldDownloadPlan::scan(&session, &layout.world_folders)
        .context("Failed to scan world folders")?;
    let rows = plan
        .folders
        .iter()
        .map(|folder| {
            vec![
                folder.spec.remote.clone(),
                folder.spec.local_name.clone(),
                folder.stats.files.to_string(),
                format_size(folder.stats.bytes),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&["REMOTE", "LOCAL", "FILES", "SIZE"], &rows);

    let mut sink = BarSink::default();
    let report = plan
        .execute(&session, &destination, !args.no_backup, prompter, &mut sink)
        .context("World download failed")?;

    if let Some(backup) = &report.backup {
        println!("Previous local world copied to {}", backup.display());
    }
    print_summary("Downloaded", &report.transfer);
    for folder in &report.folders {
        println!("  {}", folder.display());
    }
    Ok(())
}

pub fn properties(settings: &Settings) -> Result<()> {
    let session = connect_remote(settings)?;
    let layout = RemoteLayout::default();
    let properties = read_remote_properties(&session, &layout.properties_path)
        .with_context(|| format!("Failed to read {}", layout.properties_path))?;
    for (key, value) in properties {
        println!("{key}={value}");
    }
    Ok(())
}
