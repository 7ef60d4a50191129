//! Copy the production world folders into a local server directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::errors::HostError;
use crate::layout::{PRODUCTION_WORLD, RemoteDirectorySpec};
use crate::progress::{ProgressSink, ProgressSnapshot, TransferTracker, format_size};
use crate::prompt::{Prompter, require_confirmation};
use crate::remote::RemoteSession;
use crate::walker::{MirrorSpec, TreeStats, copy_local_tree, mirror, scan};

const LOCK_FILE: &str = "session.lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPlan {
    pub spec: RemoteDirectorySpec,
    pub stats: TreeStats,
}

/// Remote world folders that have something to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldDownloadPlan {
    pub folders: Vec<FolderPlan>,
}

impl WorldDownloadPlan {
    /// Scan each folder, dropping the ones that are missing or empty.
    pub fn scan(
        session: &dyn RemoteSession,
        specs: &[RemoteDirectorySpec],
    ) -> Result<Self, HostError> {
        let mut folders = Vec::new();
        for spec in specs {
            let stats = scan(session, &spec.remote)?;
            if stats.files == 0 {
                info!("{} not found or empty, skipping", spec.remote);
                continue;
            }
            folders.push(FolderPlan {
                spec: spec.clone(),
                stats,
            });
        }
        if folders.is_empty() {
            return Err(HostError::NotFound(
                "no world folders found on the remote server".to_string(),
            ));
        }
        Ok(Self { folders })
    }

    pub fn total(&self) -> TreeStats {
        self.folders.iter().fold(TreeStats::default(), |acc, folder| TreeStats {
            files: acc.files + folder.stats.files,
            bytes: acc.bytes + folder.stats.bytes,
        })
    }

    /// Download every planned folder into `destination`, replacing local copies.
    pub fn execute(
        &self,
        session: &dyn RemoteSession,
        destination: &Path,
        backup_existing: bool,
        prompter: &mut dyn Prompter,
        sink: &mut dyn ProgressSink,
    ) -> Result<WorldDownloadReport, HostError> {
        let total = self.total();

        let lock = destination.join(PRODUCTION_WORLD).join(LOCK_FILE);
        if lock.exists() {
            warn!("local server may be running ({} exists)", lock.display());
            require_confirmation(
                prompter,
                "download-world",
                "Local server may be running (session.lock exists). Continue anyway?",
            )?;
        }
        require_confirmation(
            prompter,
            "download-world",
            &format!(
                "Download {} ({} files) from the production server into {}?",
                format_size(total.bytes),
                total.files,
                destination.display()
            ),
        )?;

        let targets = self
            .folders
            .iter()
            .map(|folder| destination.join(&folder.spec.local_name))
            .collect::<Vec<_>>();
        let backup = if backup_existing {
            backup_local_world(&targets, destination)?
        } else {
            None
        };

        let mut tracker = TransferTracker::new(sink);
        tracker.begin(total.files, total.bytes);
        for (folder, target) in self.folders.iter().zip(&targets) {
            if target.exists() {
                fs::remove_dir_all(target).map_err(|err| {
                    HostError::io(format!("removing {}", target.display()), err)
                })?;
            }
            info!("downloading {}", folder.spec.remote);
            mirror(
                session,
                MirrorSpec::Download {
                    remote: &folder.spec.remote,
                    local: target,
                },
                &mut tracker,
            )?;
        }
        let transfer = tracker.end();

        Ok(WorldDownloadReport {
            folders: targets,
            backup,
            transfer,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WorldDownloadReport {
    pub folders: Vec<PathBuf>,
    pub backup: Option<PathBuf>,
    pub transfer: ProgressSnapshot,
}

/// Copy the existing local folders into `world-backup-<timestamp>/`.
/// Returns `None` when none of them exist.
pub fn backup_local_world(
    dirs: &[PathBuf],
    destination: &Path,
) -> Result<Option<PathBuf>, HostError> {
    let existing = dirs.iter().filter(|dir| dir.exists()).collect::<Vec<_>>();
    if existing.is_empty() {
        return Ok(None);
    }
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_root = destination.join(format!("world-backup-{stamp}"));
    for dir in existing {
        let Some(name) = dir.file_name() else {
            continue;
        };
        info!("backing up {}", name.to_string_lossy());
        copy_local_tree(dir, &backup_root.join(name))?;
    }
    Ok(Some(backup_root))
}
