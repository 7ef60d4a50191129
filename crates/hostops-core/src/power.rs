use std::fmt;

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPowerState {
    Offline,
    Starting,
    Running,
    Stopping,
    Unknown,
}

impl ServerPowerState {
    pub fn from_panel(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "offline" => Self::Offline,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Starting)
    }
}

impl fmt::Display for ServerPowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Start,
    Stop,
    Restart,
    Kill,
}

impl PowerAction {
    pub fn signal(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Kill => "kill",
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signal())
    }
}

/// Management capability of the hosting panel.
pub trait PowerApi {
    fn query_state(&self) -> Result<ServerPowerState, ApiError>;
    fn send_power(&self, action: PowerAction) -> Result<(), ApiError>;
    fn send_command(&self, command: &str) -> Result<(), ApiError>;
}

impl<T: PowerApi + ?Sized> PowerApi for &T {
    fn query_state(&self) -> Result<ServerPowerState, ApiError> {
        (**self).query_state()
    }

    fn send_power(&self, action: PowerAction) -> Result<(), ApiError> {
        (**self).send_power(action)
    }

    fn send_command(&self, command: &str) -> Result<(), ApiError> {
        (**self).send_command(command)
    }
}
