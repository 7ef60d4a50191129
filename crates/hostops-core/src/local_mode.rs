use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::{info, warn};

use crate::errors::HostError;
use crate::layout::PRODUCTION_WORLD;
use crate::walker::copy_local_tree;

const PROPERTIES: &str = "server.properties";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalMode {
    Production,
    Test,
}

impl LocalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    fn template(self) -> String {
        format!("{PROPERTIES}.{}", self.as_str())
    }
}

impl fmt::Display for LocalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocalMode {
    type Err = HostError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(HostError::Configuration(format!(
                "unknown local mode '{other}' (expected production or test)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalModeReport {
    pub mode: LocalMode,
    /// Top-level config entries synced from the project.
    pub configs_synced: Option<usize>,
    pub world_present: bool,
}

/// Point the local test server at the production or test settings.
pub fn switch_local_mode(
    mode: LocalMode,
    server_dir: &Path,
    project_dir: &Path,
) -> Result<LocalModeReport, HostError> {
    let template = server_dir.join(mode.template());
    if !template.exists() {
        return Err(HostError::NotFound(template.display().to_string()));
    }
    let properties = server_dir.join(PROPERTIES);
    fs::copy(&template, &properties)
        .map_err(|err| HostError::io(format!("copying {}", template.display()), err))?;
    info!("server.properties switched to {mode} mode");

    let configs_synced = match mode {
        LocalMode::Production => sync_configs(&project_dir.join("config"), &server_dir.join("config"))?,
        LocalMode::Test => None,
    };

    Ok(LocalModeReport {
        mode,
        configs_synced,
        world_present: server_dir.join(PRODUCTION_WORLD).is_dir(),
    })
}

/// Copy each entry of `src` into `dst`. Directories are replaced wholesale.
fn sync_configs(src: &Path, dst: &Path) -> Result<Option<usize>, HostError> {
    if !src.is_dir() {
        warn!("{} not found, skipping config sync", src.display());
        return Ok(None);
    }
    fs::create_dir_all(dst)
        .map_err(|err| HostError::io(format!("creating {}", dst.display()), err))?;

    let entries = fs::read_dir(src)
        .map_err(|err| HostError::io(format!("reading {}", src.display()), err))?;
    let mut synced = 0;
    for entry in entries {
        let entry = entry.map_err(|err| HostError::io(format!("reading {}", src.display()), err))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            if to.exists() {
                fs::remove_dir_all(&to)
                    .map_err(|err| HostError::io(format!("removing {}", to.display()), err))?;
            }
            copy_local_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to)
                .map_err(|err| HostError::io(format!("copying {}", from.display()), err))?;
        }
        synced += 1;
    }
    Ok(Some(synced))
}
