use anyhow::{Context, Result};
use clap::Subcommand;
use hostops_core::catalog::{list_backups, request_backup};
use hostops_core::progress::format_size;
use hostops_core::{BackupEntry, BackupRequest, RemoteLayout, RestoreWorkflow};

use crate::commands::{connect_remote, panel};
use crate::config::Settings;
use crate::ui::{BarSink, TerminalPrompter, print_summary, print_table};

#[derive(Subcommand)]
pub enum BackupCommand {
    /// List every backup archive, newest first.
    List,
    /// Ask the backup mod for a differential backup.
    Create {
        #[arg(trailing_var_arg = true)]
        comment: Vec<String>,
    },
    /// Ask the backup mod for a full snapshot.
    Snapshot {
        #[arg(trailing_var_arg = true)]
        comment: Vec<String>,
    },
    /// Restore the world from a backup, by its number in `backup list`.
    Restore { index: Option<usize> },
}

pub fn run(settings: &Settings, prompter: &mut TerminalPrompter, command: BackupCommand) -> Result<()> {
    match command {
        BackupCommand::List => list(settings),
        BackupCommand::Create { comment } => create(settings, BackupRequest::Backup, &comment),
        BackupCommand::Snapshot { comment } => create(settings, BackupRequest::Snapshot, &comment),
        BackupCommand::Restore { index } => restore(settings, prompter, index),
    }
}

fn list(settings: &Settings) -> Result<()> {
    let session = connect_remote(settings)?;
    let layout = RemoteLayout::default();
    let backups = list_backups(&session, &layout.backups).context("Failed to list backups")?;
    if backups.is_empty() {
        println!("No backups found.");
        return Ok(());
    }
    print_table(&["#", "NAME", "TYPE", "SIZE", "DATE"], &backup_rows(&backups));
    Ok(())
}

fn backup_rows(backups: &[BackupEntry]) -> Vec<Vec<String>> {
    backups
        .iter()
        .enumerate()
        .map(|(position, backup)| {
            vec![
                (position + 1).to_string(),
                backup.name.clone(),
                backup.kind.to_string(),
                format_size(backup.size),
                backup.display_date(),
            ]
        })
        .collect()
}

fn create(settings: &Settings, request: BackupRequest, comment: &[String]) -> Result<()> {
    let lifecycle = panel(settings)?;
    let command = request_backup(lifecycle.power(), request, &comment.join(" "))?;
    println!("Sent: {command}");
    println!("Check progress with `hostops backup list` once the backup mod reports completion.");
    Ok(())
}

fn restore(settings: &Settings, prompter: &mut TerminalPrompter, index: Option<usize>) -> Result<()> {
    let lifecycle = panel(settings)?;
    let session = connect_remote(settings)?;
    let layout = RemoteLayout::default();
    let mut sink = BarSink::default();

    let report = RestoreWorkflow::new(&session, &lifecycle, &layout)
        .run(index, prompter, &mut sink)
        .context("Restore failed")?;

    println!("Restored {} ({} archive(s)).", report.restored, report.chain.len());
    for name in &report.chain {
        println!("  {name}");
    }
    print_summary("Uploaded", &report.upload);
    println!("Start signal sent.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use hostops_core::BackupKind;

    use super::*;

    #[test]
    fn rows_are_numbered_from_one() {
        let backups = vec![
            BackupEntry {
                name: "2024-05-02-full.zip".to_string(),
                path: "/backups/world/differential/2024-05-02-full.zip".to_string(),
                size: 2048,
                modified: 1_714_608_000,
                kind: BackupKind::DifferentialFull,
            },
            BackupEntry {
                name: "manual.zip".to_string(),
                path: "/backups/world/zips/manual.zip".to_string(),
                size: 10,
                modified: 1_714_000_000,
                kind: BackupKind::PlainArchive,
            },
        ];
        let rows = backup_rows(&backups);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "1");
        assert_eq!(rows[1][0], "2");
        assert_eq!(rows[1][1], "manual.zip");
        assert_eq!(rows[0][2], BackupKind::DifferentialFull.to_string());
    }
}
