use anyhow::{Context, Result};
use clap::Args;
use hostops_core::RemoteLayout;
use hostops_core::deploy::{ModpackInfo, deploy_server_pack, list_remote_dir, upload_directory};
use hostops_core::progress::format_size;

use crate::commands::connect_remote;
use crate::config::Settings;
use crate::ui::{BarSink, print_summary, print_table};

#[derive(Args)]
pub struct UpdatePackArgs {
    /// Release version, e.g. `1.4.0`.
    version: String,
}

pub fn deploy(settings: &Settings) -> Result<()> {
    let session = connect_remote(settings)?;
    let mut sink = BarSink::default();
    let uploaded = deploy_server_pack(&session, &settings.project_dir, &mut sink)
        .context("Deploy failed")?;
    for path in uploaded {
        println!("Uploaded {path}");
    }
    Ok(())
}

pub fn configs(settings: &Settings) -> Result<()> {
    let session = connect_remote(settings)?;
    let layout = RemoteLayout::default();
    let local = settings.project_dir.join("config");
    let mut sink = BarSink::default();
    let summary = upload_directory(&session, &local, &layout.config_dir, &mut sink)
        .with_context(|| format!("Failed to upload {}", local.display()))?;
    print_summary("Configs uploaded", &summary);
    Ok(())
}

pub fn list_files(settings: &Settings) -> Result<()> {
    let session = connect_remote(settings)?;
    let entries = list_remote_dir(&session, "/").context("Failed to list remote files")?;
    let rows = entries
        .iter()
        .map(|entry| {
            let (kind, size) = if entry.is_dir() {
                ("DIR", String::new())
            } else {
                ("FILE", format_size(entry.size))
            };
            vec![kind.to_string(), entry.name.clone(), size]
        })
        .collect::<Vec<_>>();
    print_table(&["TYPE", "NAME", "SIZE"], &rows);
    Ok(())
}

pub fn update_pack(settings: &Settings, args: UpdatePackArgs) -> Result<()> {
    let version = args.version.trim().trim_start_matches('v');
    let info = ModpackInfo::for_release(&settings.project_dir, &settings.modpack_repo, version)?;
    let digest = info.sha512.get(..16).unwrap_or(info.sha512.as_str());
    println!("{} ({}, sha512 {digest}...)", info.url, format_size(info.size));

    let session = connect_remote(settings)?;
    let layout = RemoteLayout::default();
    info.upload(&session, &layout.modpack_info_path)
        .context("Failed to write modpack info")?;
    println!("Server will install {version} on next restart.");
    Ok(())
}
