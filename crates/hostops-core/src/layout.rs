use crate::catalog::BackupLocations;

/// Local folder holding the production overworld.
pub const PRODUCTION_WORLD: &str = "world-production";

/// Where a remote directory is staged locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDirectorySpec {
    pub remote: String,
    pub local_name: String,
}

impl RemoteDirectorySpec {
    pub fn new(remote: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            local_name: local_name.into(),
        }
    }
}

/// Fixed paths on the game host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    pub world_dir: String,
    pub properties_path: String,
    pub config_dir: String,
    pub modpack_info_path: String,
    pub backups: BackupLocations,
    pub world_folders: Vec<RemoteDirectorySpec>,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            world_dir: "/world".to_string(),
            properties_path: "/server.properties".to_string(),
            config_dir: "/config".to_string(),
            modpack_info_path: "/modpack-info.json".to_string(),
            backups: BackupLocations::default(),
            world_folders: vec![
                RemoteDirectorySpec::new("/world", PRODUCTION_WORLD),
                RemoteDirectorySpec::new("/world_nether", "world-production_nether"),
                RemoteDirectorySpec::new("/world_the_end", "world-production_the_end"),
            ],
        }
    }
}
