use anyhow::{Context, Result, bail};
use clap::Args;
use hostops_core::{PowerAction, PowerApi};
use panel_client::is_starting_error;

use crate::commands::panel;
use crate::config::Settings;

#[derive(Args)]
pub struct CommandArgs {
    /// Console command, without the leading slash.
    #[arg(required = true, trailing_var_arg = true)]
    text: Vec<String>,
}

pub fn status(settings: &Settings) -> Result<()> {
    let lifecycle = panel(settings)?;
    let state = lifecycle.query_state().context("Failed to query server state")?;
    println!("Server status: {}", state.as_str().to_ascii_uppercase());
    Ok(())
}

pub fn start(settings: &Settings) -> Result<()> {
    power(settings, PowerAction::Start)
}

pub fn stop(settings: &Settings) -> Result<()> {
    power(settings, PowerAction::Stop)
}

pub fn restart(settings: &Settings) -> Result<()> {
    power(settings, PowerAction::Restart)
}

fn power(settings: &Settings, action: PowerAction) -> Result<()> {
    let lifecycle = panel(settings)?;
    lifecycle
        .send_power(action)
        .with_context(|| format!("Failed to send {action} signal"))?;
    println!("Sent {action} signal.");
    Ok(())
}

pub fn command(settings: &Settings, args: CommandArgs) -> Result<()> {
    let text = args.text.join(" ");
    let text = text.trim().trim_start_matches('/');
    if text.is_empty() {
        bail!("command must not be empty");
    }
    let lifecycle = panel(settings)?;
    match lifecycle.power().send_command(text) {
        Ok(()) => {
            println!("Sent: {text}");
            Ok(())
        }
        Err(err) if is_starting_error(&err) => {
            bail!("command rejected (HTTP 502); the server may still be starting")
        }
        Err(err) => Err(err).context("Failed to send console command"),
    }
}
