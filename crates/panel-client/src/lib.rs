//! Blocking client for the hosting panel's client API.

use std::time::Duration;

use hostops_core::{ApiError, PowerAction, PowerApi, ServerPowerState};
use reqwest::blocking::{Client, Response};
use reqwest::header;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://mc.bloom.host";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
enum PanelError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("credentials rejected (HTTP {0})")]
    Unauthorized(u16),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Body(#[from] serde_json::Error),
}

impl From<PanelError> for ApiError {
    fn from(err: PanelError) -> Self {
        match err {
            PanelError::Http(err) => ApiError::Transport(err.to_string()),
            PanelError::Unauthorized(status) => ApiError::Unauthorized(status),
            PanelError::Status { status, body } => ApiError::Status { status, body },
            PanelError::Body(err) => ApiError::Parse(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    pub api_url: String,
    pub api_key: String,
    pub server_id: String,
}

#[derive(Deserialize)]
struct ResourcesResponse {
    attributes: ResourceAttributes,
}

#[derive(Deserialize)]
struct ResourceAttributes {
    current_state: String,
}

#[derive(Serialize)]
struct PowerRequest<'a> {
    signal: &'a str,
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    command: &'a str,
}

pub struct PanelClient {
    client: Client,
    server_url: String,
    api_key: String,
}

impl PanelClient {
    pub fn new(config: &PanelConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PanelError::from)?;
        Ok(Self {
            client,
            server_url: server_url(&config.api_url, &config.server_id),
            api_key: config.api_key.clone(),
        })
    }

    fn get(&self, endpoint: &str) -> Result<Response, PanelError> {
        let url = format!("{}/{endpoint}", self.server_url);
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .send()?;
        check_status(response)
    }

    fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<Response, PanelError> {
        let url = format!("{}/{endpoint}", self.server_url);
        debug!("POST {url}");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()?;
        check_status(response)
    }
}

impl PowerApi for PanelClient {
    fn query_state(&self) -> Result<ServerPowerState, ApiError> {
        let body = self.get("resources")?.text().map_err(PanelError::from)?;
        Ok(parse_state(&body)?)
    }

    fn send_power(&self, action: PowerAction) -> Result<(), ApiError> {
        self.post(
            "power",
            &PowerRequest {
                signal: action.signal(),
            },
        )?;
        Ok(())
    }

    fn send_command(&self, command: &str) -> Result<(), ApiError> {
        self.post("command", &CommandRequest { command })?;
        Ok(())
    }
}

fn server_url(api_url: &str, server_id: &str) -> String {
    format!(
        "{}/api/client/servers/{}",
        api_url.trim_end_matches('/'),
        server_id.trim()
    )
}

fn check_status(response: Response) -> Result<Response, PanelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(status_error(status.as_u16(), body))
}

fn status_error(status: u16, body: String) -> PanelError {
    match status {
        401 | 403 => PanelError::Unauthorized(status),
        _ => PanelError::Status { status, body },
    }
}

fn parse_state(body: &str) -> Result<ServerPowerState, PanelError> {
    let resources: ResourcesResponse = serde_json::from_str(body)?;
    Ok(ServerPowerState::from_panel(&resources.attributes.current_state))
}

/// Whether a failed console command means the server is still booting.
pub fn is_starting_error(err: &ApiError) -> bool {
    matches!(err, ApiError::Status { status: 502, .. })
}
