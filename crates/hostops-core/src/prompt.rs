use tracing::info;

use crate::errors::HostError;

/// Interactive decisions a workflow may need. The CLI renders these with a
/// terminal UI; unattended runs use [`AutoConfirm`].
pub trait Prompter {
    /// Show an irreversible-action warning and ask whether to continue.
    fn confirm(&mut self, message: &str) -> Result<bool, HostError>;

    /// Pick one of `items`, returning its position.
    fn choose(&mut self, prompt: &str, items: &[String]) -> Result<usize, HostError>;
}

/// Accepts every confirmation. Selections cannot be guessed and are refused.
#[derive(Debug, Default)]
pub struct AutoConfirm;

impl Prompter for AutoConfirm {
    fn confirm(&mut self, message: &str) -> Result<bool, HostError> {
        info!("auto-confirmed: {message}");
        Ok(true)
    }

    fn choose(&mut self, prompt: &str, _items: &[String]) -> Result<usize, HostError> {
        Err(HostError::Configuration(format!(
            "{prompt}: a selection is required when prompts are disabled"
        )))
    }
}

/// Ask for confirmation, turning a refusal into [`HostError::Cancelled`].
pub fn require_confirmation(
    prompter: &mut dyn Prompter,
    step: impl std::fmt::Display,
    message: &str,
) -> Result<(), HostError> {
    if prompter.confirm(message)? {
        Ok(())
    } else {
        Err(HostError::Cancelled(step.to_string()))
    }
}
