use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hostops_core::HostError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod config;
mod ui;

use commands::{backup, deploy, local, server, world};
use config::Settings;
use ui::TerminalPrompter;

#[derive(Parser)]
#[command(name = "hostops", version, about = "Operations for a hosted game server")]
struct Cli {
    /// Answer yes to every confirmation.
    #[arg(short, long, global = true)]
    yes: bool,
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the server power state.
    Status,
    Start,
    Stop,
    Restart,
    /// Send a console command.
    Cmd(server::CommandArgs),
    Backup {
        #[command(subcommand)]
        command: backup::BackupCommand,
    },
    /// Delete the world and generate a new one.
    Regenerate(world::RegenerateArgs),
    /// List world generation presets.
    Presets,
    /// Copy the production world folders to the local server.
    DownloadWorld(world::DownloadArgs),
    /// Switch the local server between production and test settings.
    LocalMode(local::LocalModeArgs),
    /// Upload the server jar and modpack archive.
    Deploy,
    /// Upload the project config directory.
    Configs,
    /// List the remote root directory.
    ListFiles,
    /// Point the server at a published modpack release.
    UpdatePack(deploy::UpdatePackArgs),
    /// Print the remote server.properties.
    Properties,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_cancelled(&err) => {
            println!("Cancelled.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;
    let mut prompter = TerminalPrompter::new(cli.yes);

    match cli.command {
        Commands::Status => server::status(&settings),
        Commands::Start => server::start(&settings),
        Commands::Stop => server::stop(&settings),
        Commands::Restart => server::restart(&settings),
        Commands::Cmd(args) => server::command(&settings, args),
        Commands::Backup { command } => backup::run(&settings, &mut prompter, command),
        Commands::Regenerate(args) => world::regenerate(&settings, &mut prompter, args),
        Commands::Presets => world::presets(),
        Commands::DownloadWorld(args) => world::download(&settings, &mut prompter, args),
        Commands::LocalMode(args) => local::run(&settings, args),
        Commands::Deploy => deploy::deploy(&settings),
        Commands::Configs => deploy::configs(&settings),
        Commands::ListFiles => deploy::list_files(&settings),
        Commands::UpdatePack(args) => deploy::update_pack(&settings, args),
        Commands::Properties => world::properties(&settings),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<HostError>())
        .any(HostError::is_cancelled)
}

#[cfg(test)]
mod tests {
    use anyhow::Context;
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from(["hostops", "backup", "restore", "3", "--yes"]).expect("parse");
        assert!(cli.yes);
        assert!(matches!(
            cli.command,
            Commands::Backup {
                command: backup::BackupCommand::Restore { index: Some(3) }
            }
        ));
    }

    #[test]
    fn cancellation_is_found_behind_context() {
        let err = Err::<(), _>(HostError::Cancelled("restore".to_string()))
            .context("Restore failed")
            .expect_err("error");
        assert!(is_cancelled(&err));
        let other = anyhow::Error::new(HostError::NoBackups);
        assert!(!is_cancelled(&other));
    }
}
