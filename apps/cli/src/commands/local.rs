use anyhow::{Context, Result};
use clap::Args;
use hostops_core::LocalMode;
use hostops_core::local_mode::switch_local_mode;

use crate::config::Settings;

#[derive(Args)]
pub struct LocalModeArgs {
    /// `production` or `test`.
    mode: LocalMode,
}

pub fn run(settings: &Settings, args: LocalModeArgs) -> Result<()> {
    let report = switch_local_mode(args.mode, &settings.local_server_dir, &settings.project_dir)
        .with_context(|| {
            format!(
                "Failed to switch {} to {} mode",
                settings.local_server_dir.display(),
                args.mode
            )
        })?;

    println!("Local server set to {} mode.", report.mode);
    if let Some(count) = report.configs_synced {
        println!("Synced {count} config entries from the project.");
    }
    if report.mode == LocalMode::Production && !report.world_present {
        println!("No world-production folder yet; run `hostops download-world` first.");
    }
    Ok(())
}
