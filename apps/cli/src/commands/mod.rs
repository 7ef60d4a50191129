pub mod backup;
pub mod deploy;
pub mod local;
pub mod server;
pub mod world;

use anyhow::{Context, Result};
use hostops_core::LifecycleController;
use panel_client::PanelClient;
use sftp_remote::SftpSession;

use crate::config::Settings;

/// Open the SFTP session, failing early on missing credentials.
pub fn connect_remote(settings: &Settings) -> Result<SftpSession> {
    let config = settings.require_remote()?;
    SftpSession::connect(&config)
        .with_context(|| format!("Failed to open SFTP session to {}", config.host))
}

pub fn panel(settings: &Settings) -> Result<LifecycleController<PanelClient>> {
    let config = settings.require_panel()?;
    let client = PanelClient::new(&config).context("Failed to build panel client")?;
    Ok(LifecycleController::new(client))
}
