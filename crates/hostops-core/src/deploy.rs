//! Uploads of server files and modpack metadata.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use tracing::info;

use crate::errors::HostError;
use crate::progress::{ProgressSink, ProgressSnapshot, TransferTracker, format_size};
use crate::remote::{RemoteEntry, RemoteSession, join_remote};
use crate::walker::{MirrorSpec, mirror, scan_local};

pub const SERVER_JAR: &str = "mrpack4server-0.5.0.jar";
pub const LOCAL_PACK: &str = "local.mrpack";

const WHITELISTED_DOMAINS: &[&str] = &["github.com", "objects.githubusercontent.com"];
const NON_OVERWRITABLE_PATHS: &[&str] = &[
    "world",
    "world_nether",
    "world_the_end",
    "server.properties",
    "ops.json",
    "whitelist.json",
    "banned-players.json",
    "banned-ips.json",
];

/// Upload one file, tracked as a single-file session.
pub fn upload_file(
    session: &dyn RemoteSession,
    local: &Path,
    remote: &str,
    sink: &mut dyn ProgressSink,
) -> Result<ProgressSnapshot, HostError> {
    let size = fs::metadata(local)
        .map_err(|_| HostError::NotFound(local.display().to_string()))?
        .len();
    let name = local
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| remote.to_string());
    info!("uploading {name} ({})", format_size(size));

    let mut tracker = TransferTracker::new(sink);
    tracker.begin(1, size);
    tracker.start_file(&name, size);
    let result = session.put(local, remote, &mut tracker);
    tracker.complete_file(result.is_ok());
    let summary = tracker.end();
    result.map_err(|err| HostError::Transfer {
        file: name,
        message: err.to_string(),
    })?;
    Ok(summary)
}

/// Mirror a local directory to the remote host.
pub fn upload_directory(
    session: &dyn RemoteSession,
    local: &Path,
    remote: &str,
    sink: &mut dyn ProgressSink,
) -> Result<ProgressSnapshot, HostError> {
    if !local.is_dir() {
        return Err(HostError::NotFound(local.display().to_string()));
    }
    let stats = scan_local(local);
    info!("uploading {} files ({})", stats.files, format_size(stats.bytes));
    let mut tracker = TransferTracker::new(sink);
    tracker.begin(stats.files, stats.bytes);
    mirror(session, MirrorSpec::Upload { local, remote }, &mut tracker)?;
    Ok(tracker.end())
}

/// Upload the server launcher jar and the modpack archive to the remote root.
pub fn deploy_server_pack(
    session: &dyn RemoteSession,
    project_dir: &Path,
    sink: &mut dyn ProgressSink,
) -> Result<Vec<String>, HostError> {
    let files = [SERVER_JAR, LOCAL_PACK];
    for name in files {
        let path = project_dir.join(name);
        if !path.is_file() {
            return Err(HostError::NotFound(path.display().to_string()));
        }
    }
    let mut uploaded = Vec::with_capacity(files.len());
    for name in files {
        let remote = join_remote("/", name);
        upload_file(session, &project_dir.join(name), &remote, sink)?;
        uploaded.push(remote);
    }
    Ok(uploaded)
}

/// Remote directory listing sorted by name.
pub fn list_remote_dir(
    session: &dyn RemoteSession,
    path: &str,
) -> Result<Vec<RemoteEntry>, HostError> {
    let mut entries = session.list(path)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModpackInfo {
    pub project_id: String,
    pub version_id: String,
    pub display_name: String,
    pub display_version: String,
    pub url: String,
    pub size: u64,
    pub sha512: String,
    pub whitelisted_domains: Vec<String>,
    pub non_overwritable_paths: Vec<String>,
}

impl ModpackInfo {
    /// Describe `MCC-<version>.mrpack` in `project_dir` as published on the
    /// GitHub releases page of `repo`.
    pub fn for_release(project_dir: &Path, repo: &str, version: &str) -> Result<Self, HostError> {
        let file_name = format!("MCC-{version}.mrpack");
        let pack = project_dir.join(&file_name);
        if !pack.is_file() {
            return Err(HostError::NotFound(pack.display().to_string()));
        }
        let (size, sha512) = sha512_file(&pack)?;
        Ok(Self {
            project_id: "mcc".to_string(),
            version_id: version.to_string(),
            display_name: "MCC".to_string(),
            display_version: version.to_string(),
            url: format!("https://github.com/{repo}/releases/download/v{version}/{file_name}"),
            size,
            sha512,
            whitelisted_domains: WHITELISTED_DOMAINS.iter().map(|s| s.to_string()).collect(),
            non_overwritable_paths: NON_OVERWRITABLE_PATHS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })
    }

    pub fn upload(&self, session: &dyn RemoteSession, path: &str) -> Result<(), HostError> {
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            HostError::Configuration(format!("failed to serialize modpack info: {err}"))
        })?;
        session.write(path, json.as_bytes())?;
        info!("wrote {path} for version {}", self.version_id);
        Ok(())
    }
}

fn sha512_file(path: &Path) -> Result<(u64, String), HostError> {
    let context = || format!("hashing {}", path.display());
    let mut file = fs::File::open(path).map_err(|err| HostError::io(context(), err))?;
    let mut hasher = Sha512::new();
    let mut buffer = [0u8; 8192];
    let mut size = 0u64;
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|err| HostError::io(context(), err))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }
    Ok((size, hex::encode(hasher.finalize())))
}
