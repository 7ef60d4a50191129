use std::fmt;

use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

use crate::errors::HostError;
use crate::power::{PowerApi, ServerPowerState};
use crate::remote::{RemoteSession, join_remote};

const FULL_MARKER: &str = "-full.zip";
const ARCHIVE_SUFFIX: &str = ".zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    DifferentialFull,
    DifferentialPartial,
    PlainArchive,
    Snapshot,
}

impl BackupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DifferentialFull => "differential-full",
            Self::DifferentialPartial => "differential-partial",
            Self::PlainArchive => "zip",
            Self::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag an archive found in the differential location.
pub fn classify_differential(name: &str) -> BackupKind {
    if name.contains(FULL_MARKER) {
        BackupKind::DifferentialFull
    } else {
        BackupKind::DifferentialPartial
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub modified: u64,
    pub kind: BackupKind,
}

impl BackupEntry {
    pub fn modified_local(&self) -> Option<DateTime<Local>> {
        Local.timestamp_opt(self.modified as i64, 0).single()
    }

    pub fn display_date(&self) -> String {
        self.modified_local()
            .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Remote directories the backup mod writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupLocations {
    pub differential: String,
    pub archives: String,
    pub snapshots: String,
}

impl Default for BackupLocations {
    fn default() -> Self {
        Self {
            differential: "/backups/world/differential".to_string(),
            archives: "/backups/world/zips".to_string(),
            snapshots: "/backups/world/snapshots".to_string(),
        }
    }
}

/// Query all three locations and return every archive, newest first.
pub fn list_backups(
    session: &dyn RemoteSession,
    locations: &BackupLocations,
) -> Result<Vec<BackupEntry>, HostError> {
    let mut backups = Vec::new();
    collect(session, &locations.differential, &mut backups, classify_differential)?;
    collect(session, &locations.archives, &mut backups, |_| BackupKind::PlainArchive)?;
    collect(session, &locations.snapshots, &mut backups, |_| BackupKind::Snapshot)?;
    backups.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(backups)
}

fn collect(
    session: &dyn RemoteSession,
    dir: &str,
    out: &mut Vec<BackupEntry>,
    tag: impl Fn(&str) -> BackupKind,
) -> Result<(), HostError> {
    let entries = match session.list(dir) {
        Ok(entries) => entries,
        Err(err) if err.is_not_found() => {
            debug!("backup location {dir} does not exist");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        if entry.is_dir() || !entry.name.ends_with(ARCHIVE_SUFFIX) {
            continue;
        }
        out.push(BackupEntry {
            kind: tag(&entry.name),
            path: join_remote(dir, &entry.name),
            name: entry.name,
            size: entry.size,
            modified: entry.modified,
        });
    }
    Ok(())
}

/// Pick a catalog entry by its 1-based position in the listing.
pub fn select(backups: &[BackupEntry], index: usize) -> Result<&BackupEntry, HostError> {
    if backups.is_empty() {
        return Err(HostError::NoBackups);
    }
    if index == 0 || index > backups.len() {
        return Err(HostError::InvalidSelection {
            index,
            max: backups.len(),
        });
    }
    Ok(&backups[index - 1])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupRequest {
    Backup,
    Snapshot,
}

impl BackupRequest {
    pub fn command(self, comment: &str) -> String {
        let verb = match self {
            Self::Backup => "start",
            Self::Snapshot => "snapshot",
        };
        format!("backup {verb} {comment}").trim().to_string()
    }
}

/// Ask the backup mod to write a new archive. Only a running server can do that.
pub fn request_backup(
    power: &dyn PowerApi,
    request: BackupRequest,
    comment: &str,
) -> Result<String, HostError> {
    let state = power.query_state()?;
    if state != ServerPowerState::Running {
        return Err(HostError::ServerNotRunning(state.to_string()));
    }
    let command = request.command(comment);
    power.send_command(&command)?;
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use crate::testing::{MemoryRemote, ScriptedPower};

    #[test]
    fn suffix_marks_full_differential_archives() {
        assert_eq!(
            classify_differential("2024-05-01_12-00-00-full.zip"),
            BackupKind::DifferentialFull
        );
        assert_eq!(
            classify_differential("2024-05-01_13-00-00-partial.zip"),
            BackupKind::DifferentialPartial
        );
    }

    #[test]
    fn catalog_merges_locations_newest_first() {
        let remote = MemoryRemote::new();
        remote.add_file_at("/backups/world/differential/a-full.zip", b"full", 10);
        remote.add_file_at("/backups/world/differential/b-partial.zip", b"p", 30);
        remote.add_file_at("/backups/world/differential/notes.txt", b"skip", 99);
        remote.add_file_at("/backups/world/snapshots/snap.zip", b"snap", 20);

        let backups = list_backups(&remote, &BackupLocations::default()).expect("list");
        let names = backups.iter().map(|b| b.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["b-partial.zip", "snap.zip", "a-full.zip"]);
        assert_eq!(backups[0].kind, BackupKind::DifferentialPartial);
        assert_eq!(backups[1].kind, BackupKind::Snapshot);
        assert_eq!(backups[1].path, "/backups/world/snapshots/snap.zip");
        assert_eq!(backups[2].size, 4);
    }

    #[test]
    fn missing_locations_are_empty() {
        let remote = MemoryRemote::new();
        let backups = list_backups(&remote, &BackupLocations::default()).expect("list");
        assert!(backups.is_empty());
    }

    #[test]
    fn selection_is_one_based() {
        let remote = MemoryRemote::new();
        remote.add_file_at("/backups/world/zips/x.zip", b"x", 1);
        let backups = list_backups(&remote, &BackupLocations::default()).expect("list");
        assert_eq!(select(&backups, 1).expect("select").name, "x.zip");
        assert!(matches!(
            select(&backups, 2),
            Err(HostError::InvalidSelection { index: 2, max: 1 })
        ));
        assert!(matches!(select(&[], 1), Err(HostError::NoBackups)));
    }

    #[test]
    fn backup_requests_need_a_running_server() {
        let power = ScriptedPower::always(ServerPowerState::Offline);
        let err = request_backup(&power, BackupRequest::Backup, "").expect_err("offline");
        assert!(matches!(err, HostError::ServerNotRunning(_)));
        assert!(power.commands.borrow().is_empty());

        let power = ScriptedPower::always(ServerPowerState::Running);
        let sent = request_backup(&power, BackupRequest::Snapshot, "before update")
            .expect("snapshot");
        assert_eq!(sent, "backup snapshot before update");
        assert_eq!(BackupRequest::Backup.command(""), "backup start");
    }

    #[test]
    fn panel_failures_are_not_reported_as_a_stopped_server() {
        let power = ScriptedPower::failing(401);
        let err = request_backup(&power, BackupRequest::Backup, "").expect_err("unauthorized");
        assert!(matches!(err, HostError::Api(ApiError::Unauthorized(401))));
        assert!(power.commands.borrow().is_empty());
    }
}
