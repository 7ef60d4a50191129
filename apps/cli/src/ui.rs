use std::io::{self, IsTerminal};

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, FuzzySelect, Input};
use hostops_core::progress::truncate_display_name;
use hostops_core::{AutoConfirm, HostError, ProgressSink, ProgressSnapshot, Prompter};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

const NAME_WIDTH: usize = 60;

pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Prompts on the terminal, or accepts everything when `--yes` was given.
pub struct TerminalPrompter {
    assume_yes: bool,
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            theme: ColorfulTheme::default(),
        }
    }

    pub fn assume_yes(&self) -> bool {
        self.assume_yes
    }

    /// Free-text input with a default, skipped under `--yes`.
    pub fn input(&self, prompt: &str, default: &str) -> Result<String, HostError> {
        if self.assume_yes {
            return Ok(default.to_string());
        }
        ensure_terminal(prompt)?;
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default.to_string())
            .allow_empty(true)
            .interact_text()
            .map_err(|err| HostError::Configuration(format!("failed to read input: {err}")))
    }
}

fn ensure_terminal(prompt: &str) -> Result<(), HostError> {
    if is_interactive() {
        Ok(())
    } else {
        Err(HostError::Configuration(format!(
            "{prompt}: not a terminal; re-run with --yes or pass the value as an argument"
        )))
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, message: &str) -> Result<bool, HostError> {
        println!("\n{message}");
        if self.assume_yes {
            return AutoConfirm.confirm(message);
        }
        ensure_terminal("confirmation")?;
        Confirm::with_theme(&self.theme)
            .with_prompt("Proceed?")
            .default(false)
            .interact()
            .map_err(|err| HostError::Configuration(format!("failed to read confirmation: {err}")))
    }

    fn choose(&mut self, prompt: &str, items: &[String]) -> Result<usize, HostError> {
        ensure_terminal(prompt)?;
        FuzzySelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(|err| HostError::Configuration(format!("failed to read selection: {err}")))
    }
}

/// Renders a transfer session as an overall bar plus a per-file bar.
#[derive(Default)]
pub struct BarSink {
    multi: MultiProgress,
    overall: Option<ProgressBar>,
    file: Option<ProgressBar>,
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

impl ProgressSink for BarSink {
    fn session_started(&mut self, snapshot: &ProgressSnapshot) {
        if snapshot.is_aggregate() {
            let bar = self.multi.add(ProgressBar::new(snapshot.total_bytes));
            bar.set_style(bar_style(
                "{prefix:.bold} [{bar:40.green/white}] {bytes}/{total_bytes} {bytes_per_sec} eta {eta}",
            ));
            bar.set_prefix(format!("0/{} files", snapshot.total_files));
            self.overall = Some(bar);
        }
    }

    fn file_started(&mut self, name: &str, size: u64) {
        let bar = self.multi.add(ProgressBar::new(size));
        bar.set_style(bar_style(
            "{msg:60.cyan} [{bar:30.cyan/blue}] {bytes}/{total_bytes}",
        ));
        bar.set_message(truncate_display_name(name, NAME_WIDTH));
        self.file = Some(bar);
    }

    fn file_progress(&mut self, transferred: u64) {
        if let Some(bar) = &self.file {
            bar.set_position(transferred);
        }
    }

    fn file_finished(&mut self, success: bool) {
        if let Some(bar) = self.file.take() {
            if success {
                bar.finish_and_clear();
                self.multi.remove(&bar);
            } else {
                bar.abandon_with_message(format!("failed: {}", bar.message()));
            }
        }
    }

    fn overall(&mut self, snapshot: &ProgressSnapshot) {
        if let Some(bar) = &self.overall {
            bar.set_position(snapshot.transferred);
            bar.set_prefix(format!(
                "{}/{} files",
                snapshot.files_done(),
                snapshot.total_files
            ));
        }
    }

    fn session_finished(&mut self, _snapshot: &ProgressSnapshot) {
        if let Some(bar) = self.overall.take() {
            bar.finish_and_clear();
        }
        if let Some(bar) = self.file.take() {
            bar.finish_and_clear();
        }
    }
}

/// Print rows as left-aligned columns under a header.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths = headers.iter().map(|header| header.len()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let render = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    println!(
        "{}",
        render(headers.iter().map(|header| header.to_string()).collect())
    );
    println!(
        "{}",
        render(widths.iter().map(|width| "-".repeat(*width)).collect())
    );
    for row in rows {
        println!("{}", render(row.clone()));
    }
}

pub fn print_summary(label: &str, snapshot: &ProgressSnapshot) {
    if snapshot.failed > 0 {
        println!(
            "{label}: {} succeeded, {} failed",
            snapshot.succeeded, snapshot.failed
        );
    } else {
        println!("{label}: {} file(s)", snapshot.succeeded);
    }
}
