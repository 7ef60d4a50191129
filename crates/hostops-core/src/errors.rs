use thiserror::Error;

/// Failure reported by a remote session primitive.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote path not found: {0}")]
    NotFound(String),

    #[error("remote I/O failed for {path}: {message}")]
    Io { path: String, message: String },

    #[error("remote transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn io(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Io {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Failure reported by the management API. Every variant means "no result".
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("panel rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("panel request failed (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    #[error("panel unreachable: {0}")]
    Transport(String),

    #[error("unexpected panel response: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Transport(#[from] RemoteError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cannot restore {partial}: no full backup precedes it")]
    ChainBroken { partial: String },

    #[error("transfer of {file} failed: {message}")]
    Transfer { file: String, message: String },

    #[error("server did not reach {target} (last seen: {last_seen})")]
    LifecycleTimeout { target: String, last_seen: String },

    #[error("cancelled at {0}")]
    Cancelled(String),

    #[error("invalid backup number {index}; choose 1-{max}")]
    InvalidSelection { index: usize, max: usize },

    #[error("no backups found")]
    NoBackups,

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("server is not running (status: {0})")]
    ServerNotRunning(String),

    #[error("archive {archive} is invalid: {message}")]
    Archive { archive: String, message: String },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<HostError>,
    },
}

impl HostError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Attach the workflow step that was running when the error surfaced.
    pub fn at(self, step: impl std::fmt::Display) -> Self {
        match self {
            // keep the innermost step and let cancellations speak for themselves
            HostError::Step { .. } | HostError::Cancelled(_) => self,
            other => HostError::Step {
                step: step.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, HostError::Cancelled(_))
    }

    /// The step recorded by [`HostError::at`], if any.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            HostError::Step { step, .. } => Some(step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_context_is_kept_once() {
        let err = HostError::NoBackups.at("Selecting").at("Restore");
        assert_eq!(err.failed_step(), Some("Selecting"));
        assert_eq!(err.to_string(), "Selecting failed: no backups found");
    }

    #[test]
    fn cancellation_is_not_wrapped() {
        let err = HostError::Cancelled("Confirming".into()).at("Confirming");
        assert!(err.is_cancelled());
        assert_eq!(err.failed_step(), None);
    }
}
