//! Recursive scan, mirror and delete over a [`RemoteSession`].
//!
//! Traversal and transfers are strictly sequential. A file that fails to
//! transfer is logged and counted on the tracker; its siblings still run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::{HostError, RemoteError};
use crate::progress::TransferTracker;
use crate::remote::{RemoteSession, join_remote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub files: u64,
    pub bytes: u64,
}

/// Count files and bytes under a remote directory. A missing root is an empty tree.
pub fn scan(session: &dyn RemoteSession, root: &str) -> Result<TreeStats, HostError> {
    match session.stat(root) {
        Ok(_) => {}
        Err(err) if err.is_not_found() => return Ok(TreeStats::default()),
        Err(err) => return Err(err.into()),
    }
    let mut stats = TreeStats::default();
    scan_dir(session, root, &mut stats);
    Ok(stats)
}

fn scan_dir(session: &dyn RemoteSession, dir: &str, stats: &mut TreeStats) {
    let entries = match session.list(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("skipping unreadable directory {dir}: {err}");
            return;
        }
    };
    for entry in entries {
        if entry.is_dir() {
            scan_dir(session, &entry.path, stats);
        } else {
            stats.files += 1;
            stats.bytes += entry.size;
        }
    }
}

/// Count files and bytes under a local directory.
pub fn scan_local(root: &Path) -> TreeStats {
    let mut stats = TreeStats::default();
    if !root.exists() {
        return stats;
    }
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        stats.files += 1;
        stats.bytes += entry.metadata().map(|meta| meta.len()).unwrap_or(0);
    }
    stats
}

#[derive(Debug, Clone, Copy)]
pub enum MirrorSpec<'a> {
    Download { remote: &'a str, local: &'a Path },
    Upload { local: &'a Path, remote: &'a str },
}

/// Copy a whole tree in the given direction, reporting each file to `tracker`.
///
/// The tracker session (`begin`/`end`) is owned by the caller so one session can
/// span several mirrors. Display names are relative to the root of this mirror.
pub fn mirror(
    session: &dyn RemoteSession,
    spec: MirrorSpec<'_>,
    tracker: &mut TransferTracker<'_>,
) -> Result<(), HostError> {
    match spec {
        MirrorSpec::Download { remote, local } => {
            fs::create_dir_all(local)
                .map_err(|err| HostError::io(format!("creating {}", local.display()), err))?;
            download_dir(session, remote, local, "", tracker);
        }
        MirrorSpec::Upload { local, remote } => {
            if !local.is_dir() {
                return Err(HostError::NotFound(local.display().to_string()));
            }
            session.ensure_dir(remote)?;
            upload_dir(session, local, remote, "", tracker);
        }
    }
    Ok(())
}

fn relative_name(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

fn download_dir(
    session: &dyn RemoteSession,
    remote_dir: &str,
    local_dir: &Path,
    rel_dir: &str,
    tracker: &mut TransferTracker<'_>,
) {
    let entries = match session.list(remote_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("error accessing {remote_dir}: {err}");
            return;
        }
    };

    for entry in entries {
        let local_item = local_dir.join(&entry.name);
        let rel = relative_name(rel_dir, &entry.name);
        if entry.is_dir() {
            if let Err(err) = fs::create_dir_all(&local_item) {
                warn!("cannot create {}: {err}", local_item.display());
                continue;
            }
            download_dir(session, &entry.path, &local_item, &rel, tracker);
            continue;
        }

        tracker.start_file(&rel, entry.size);
        match session.get(&entry.path, &local_item, &mut *tracker) {
            Ok(_) => tracker.complete_file(true),
            Err(err) => {
                warn!("error downloading {rel}: {err}");
                tracker.complete_file(false);
            }
        }
    }
}

fn upload_dir(
    session: &dyn RemoteSession,
    local_dir: &Path,
    remote_dir: &str,
    rel_dir: &str,
    tracker: &mut TransferTracker<'_>,
) {
    let entries = match read_local_dir(local_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("error accessing {}: {err}", local_dir.display());
            return;
        }
    };

    for local_item in entries {
        let Some(name) = local_item.file_name().map(|name| name.to_string_lossy().to_string())
        else {
            continue;
        };
        let remote_item = join_remote(remote_dir, &name);
        let rel = relative_name(rel_dir, &name);

        if local_item.is_dir() {
            if let Err(err) = session.ensure_dir(&remote_item) {
                // the puts below will fail and be counted individually
                warn!("cannot create {remote_item}: {err}");
            }
            upload_dir(session, &local_item, &remote_item, &rel, tracker);
            continue;
        }
        if !local_item.is_file() {
            debug!("skipping special file {}", local_item.display());
            continue;
        }

        let size = fs::metadata(&local_item).map(|meta| meta.len()).unwrap_or(0);
        tracker.start_file(&rel, size);
        match session.put(&local_item, &remote_item, &mut *tracker) {
            Ok(_) => tracker.complete_file(true),
            Err(err) => {
                warn!("error uploading {rel}: {err}");
                tracker.complete_file(false);
            }
        }
    }
}

fn read_local_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

/// Delete a remote tree. Returns `false` when there was nothing to delete.
pub fn remove_tree(session: &dyn RemoteSession, root: &str) -> Result<bool, HostError> {
    match session.stat(root) {
        Ok(entry) if !entry.is_dir() => {
            session.remove_file(root)?;
            return Ok(true);
        }
        Ok(_) => {}
        Err(err) if err.is_not_found() => return Ok(false),
        Err(err) => return Err(err.into()),
    }
    remove_dir_recursive(session, root)?;
    Ok(true)
}

fn remove_dir_recursive(session: &dyn RemoteSession, dir: &str) -> Result<(), RemoteError> {
    for entry in session.list(dir)? {
        if entry.is_dir() {
            remove_dir_recursive(session, &entry.path)?;
        } else {
            session.remove_file(&entry.path)?;
        }
    }
    session.remove_dir(dir)
}

/// Recursively copy a local directory.
pub fn copy_local_tree(src: &Path, dst: &Path) -> Result<u64, HostError> {
    let mut copied = 0;
    fs::create_dir_all(dst).map_err(|err| HostError::io(format!("creating {}", dst.display()), err))?;
    for path in read_local_dir(src).map_err(|err| HostError::io(format!("reading {}", src.display()), err))? {
        let Some(name) = path.file_name() else {
            continue;
        };
        let dest = dst.join(name);
        if path.is_dir() {
            copied += copy_local_tree(&path, &dest)?;
        } else if path.is_file() {
            fs::copy(&path, &dest)
                .map_err(|err| HostError::io(format!("copying {}", path.display()), err))?;
            copied += 1;
        }
    }
    Ok(copied)
}
