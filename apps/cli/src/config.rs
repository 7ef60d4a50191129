use std::path::PathBuf;

use anyhow::{Context, Result};
use hostops_core::HostError;
use panel_client::{DEFAULT_API_URL, PanelConfig};
use sftp_remote::SftpConfig;
use tracing::debug;

const DEFAULT_SFTP_PORT: u16 = 2022;
const DEFAULT_LOCAL_SERVER_DIR: &str = "../LocalServer";
const DEFAULT_MODPACK_REPO: &str = "mindfulent/MCC";

#[derive(Debug, Clone)]
pub struct Settings {
    pub sftp_host: Option<String>,
    pub sftp_port: u16,
    pub sftp_username: Option<String>,
    pub sftp_password: Option<String>,
    pub api_url: String,
    pub api_key: Option<String>,
    pub server_id: Option<String>,
    pub local_server_dir: PathBuf,
    pub project_dir: PathBuf,
    pub modpack_repo: String,
}

impl Settings {
    /// Read settings from the environment, seeded from `.env` when present.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err).context("Failed to read .env"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| normalize_optional(lookup(key));

        let sftp_port = match var("SFTP_PORT") {
            Some(port) => port
                .parse::<u16>()
                .with_context(|| format!("SFTP_PORT must be a port number, got '{port}'"))?,
            None => DEFAULT_SFTP_PORT,
        };
        let project_dir = var("HOSTOPS_PROJECT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let local_server_dir = var("HOSTOPS_LOCAL_SERVER_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| project_dir.join(DEFAULT_LOCAL_SERVER_DIR));

        Ok(Self {
            sftp_host: var("SFTP_HOST"),
            sftp_port,
            sftp_username: var("SFTP_USERNAME"),
            sftp_password: var("SFTP_PASSWORD"),
            api_url: var("PTERODACTYL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key: var("PTERODACTYL_API_KEY"),
            server_id: var("PTERODACTYL_SERVER_ID"),
            local_server_dir,
            project_dir,
            modpack_repo: var("HOSTOPS_MODPACK_REPO")
                .unwrap_or_else(|| DEFAULT_MODPACK_REPO.to_string()),
        })
    }

    pub fn require_remote(&self) -> Result<SftpConfig, HostError> {
        let missing = missing_vars(&[
            ("SFTP_HOST", &self.sftp_host),
            ("SFTP_USERNAME", &self.sftp_username),
            ("SFTP_PASSWORD", &self.sftp_password),
        ]);
        match (&self.sftp_host, &self.sftp_username, &self.sftp_password) {
            (Some(host), Some(username), Some(password)) => Ok(SftpConfig {
                host: host.clone(),
                port: self.sftp_port,
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(missing_error(missing)),
        }
    }

    pub fn require_panel(&self) -> Result<PanelConfig, HostError> {
        let missing = missing_vars(&[
            ("PTERODACTYL_API_KEY", &self.api_key),
            ("PTERODACTYL_SERVER_ID", &self.server_id),
        ]);
        match (&self.api_key, &self.server_id) {
            (Some(api_key), Some(server_id)) => Ok(PanelConfig {
                api_url: self.api_url.clone(),
                api_key: api_key.clone(),
                server_id: server_id.clone(),
            }),
            _ => Err(missing_error(missing)),
        }
    }
}

fn missing_vars(vars: &[(&'static str, &Option<String>)]) -> Vec<&'static str> {
    vars.iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect()
}

fn missing_error(missing: Vec<&str>) -> HostError {
    HostError::Configuration(format!(
        "missing {} (set them in the environment or a .env file)",
        missing.join(", ")
    ))
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let map = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = settings(&[]).expect("settings");
        assert_eq!(settings.sftp_port, 2022);
        assert_eq!(settings.api_url, "https://mc.bloom.host");
        assert_eq!(settings.modpack_repo, "mindfulent/MCC");
        assert_eq!(settings.local_server_dir, PathBuf::from(".").join("../LocalServer"));
    }

    #[test]
    fn missing_credentials_are_listed_together() {
        let settings = settings(&[("SFTP_HOST", "mc.example"), ("SFTP_PASSWORD", "  ")])
            .expect("settings");
        let err = settings.require_remote().expect_err("incomplete");
        let message = err.to_string();
        assert!(message.contains("SFTP_USERNAME"));
        assert!(message.contains("SFTP_PASSWORD"));
        assert!(!message.contains("SFTP_HOST"));
        assert!(settings.require_panel().is_err());
    }

    #[test]
    fn complete_settings_build_connection_configs() {
        let settings = settings(&[
            ("SFTP_HOST", "mc.example"),
            ("SFTP_PORT", "2200"),
            ("SFTP_USERNAME", "mc"),
            ("SFTP_PASSWORD", "secret"),
            ("PTERODACTYL_API_KEY", "key"),
            ("PTERODACTYL_SERVER_ID", "abc"),
        ])
        .expect("settings");
        assert_eq!(settings.require_remote().expect("remote").port, 2200);
        assert_eq!(settings.require_panel().expect("panel").server_id, "abc");
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(settings(&[("SFTP_PORT", "ssh")]).is_err());
    }
}
