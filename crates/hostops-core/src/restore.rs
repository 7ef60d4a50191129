//! Restore a world backup onto the game host.
//!
//! The workflow is a linear state machine. Every failure is tagged with the
//! step it happened in, and the local staging directory is removed on every
//! exit path.

use std::fmt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, warn};

use crate::archive::extract_chain;
use crate::catalog::{BackupEntry, list_backups, select};
use crate::chain::{RestoreChain, resolve};
use crate::errors::HostError;
use crate::layout::RemoteLayout;
use crate::lifecycle::{LifecycleController, StopOutcome, WaitPolicy};
use crate::power::{PowerAction, PowerApi};
use crate::progress::{ProgressSink, ProgressSnapshot, TransferTracker, format_size};
use crate::prompt::{Prompter, require_confirmation};
use crate::remote::RemoteSession;
use crate::walker::{MirrorSpec, mirror, remove_tree, scan_local};

const STAGING_PREFIX: &str = "mc_restore_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStep {
    Selecting,
    Confirming,
    StoppingServer,
    Downloading,
    Extracting,
    ClearingRemote,
    Uploading,
    Restarting,
    Done,
    Aborted,
}

impl fmt::Display for RestoreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Selecting => "selecting backup",
            Self::Confirming => "confirming restore",
            Self::StoppingServer => "stopping server",
            Self::Downloading => "downloading backups",
            Self::Extracting => "extracting backups",
            Self::ClearingRemote => "clearing remote world",
            Self::Uploading => "uploading world",
            Self::Restarting => "restarting server",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub restored: String,
    pub chain: Vec<String>,
    pub stop: StopOutcome,
    pub upload: ProgressSnapshot,
}

pub struct RestoreWorkflow<'a, P> {
    session: &'a dyn RemoteSession,
    lifecycle: &'a LifecycleController<P>,
    layout: &'a RemoteLayout,
    policy: WaitPolicy,
    step: RestoreStep,
}

impl<'a, P: PowerApi> RestoreWorkflow<'a, P> {
    pub fn new(
        session: &'a dyn RemoteSession,
        lifecycle: &'a LifecycleController<P>,
        layout: &'a RemoteLayout,
    ) -> Self {
        Self {
            session,
            lifecycle,
            layout,
            policy: WaitPolicy::restore(),
            step: RestoreStep::Selecting,
        }
    }

    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn step(&self) -> RestoreStep {
        self.step
    }

    /// Restore the backup at 1-based `index` in the catalog, prompting for one
    /// when `index` is `None`.
    pub fn run(
        &mut self,
        index: Option<usize>,
        prompter: &mut dyn Prompter,
        sink: &mut dyn ProgressSink,
    ) -> Result<RestoreReport, HostError> {
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(|err| HostError::io("creating staging directory", err))?;

        let result = self.execute(index, prompter, sink, &staging);
        if let Err(err) = staging.close() {
            warn!("failed to remove staging directory: {err}");
        }

        match result {
            Ok(report) => {
                self.enter(RestoreStep::Done);
                Ok(report)
            }
            Err(err) => {
                let failed = self.step;
                self.step = RestoreStep::Aborted;
                warn!("restore aborted while {failed}: {err}");
                Err(err.at(failed))
            }
        }
    }

    fn enter(&mut self, step: RestoreStep) {
        info!("restore: {step}");
        self.step = step;
    }

    fn execute(
        &mut self,
        index: Option<usize>,
        prompter: &mut dyn Prompter,
        sink: &mut dyn ProgressSink,
        staging: &TempDir,
    ) -> Result<RestoreReport, HostError> {
        self.enter(RestoreStep::Selecting);
        let chain = self.select_chain(index, prompter)?;

        self.enter(RestoreStep::Confirming);
        let target = chain.target().name.clone();
        let message = format!(
            "Restore {target}? Downloads {} across {} backup(s). This will REPLACE the current world.",
            format_size(chain.total_size()),
            chain.len()
        );
        require_confirmation(prompter, RestoreStep::Confirming, &message)?;

        self.enter(RestoreStep::StoppingServer);
        let stop = self.lifecycle.wait_for_offline(&self.policy)?;

        self.enter(RestoreStep::Downloading);
        let archives = self.download_chain(&chain, staging.path(), sink)?;

        self.enter(RestoreStep::Extracting);
        let world = staging.path().join("world");
        extract_chain(&archives, &world)?;

        self.enter(RestoreStep::ClearingRemote);
        remove_tree(self.session, &self.layout.world_dir)?;
        self.session.ensure_dir(&self.layout.world_dir)?;

        self.enter(RestoreStep::Uploading);
        let upload = self.upload_world(&world, sink)?;

        self.enter(RestoreStep::Restarting);
        self.lifecycle.send_power(PowerAction::Start)?;

        Ok(RestoreReport {
            restored: target,
            chain: chain.entries().iter().map(|entry| entry.name.clone()).collect(),
            stop,
            upload,
        })
    }

    fn select_chain(
        &self,
        index: Option<usize>,
        prompter: &mut dyn Prompter,
    ) -> Result<RestoreChain, HostError> {
        let backups = list_backups(self.session, &self.layout.backups)?;
        if backups.is_empty() {
            return Err(HostError::NoBackups);
        }
        let index = match index {
            Some(index) => index,
            None => {
                let items = backups.iter().map(describe).collect::<Vec<_>>();
                prompter.choose("Select backup to restore", &items)? + 1
            }
        };
        let selected = select(&backups, index)?;
        let chain = resolve(&backups, selected)?;
        if chain.len() > 1 {
            info!(
                "partial backup {} needs base {}",
                selected.name,
                chain.entries()[0].name
            );
        }
        Ok(chain)
    }

    fn download_chain(
        &self,
        chain: &RestoreChain,
        staging: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<PathBuf>, HostError> {
        let mut archives = Vec::with_capacity(chain.len());
        for entry in chain.entries() {
            let local = staging.join(&entry.name);
            let mut tracker = TransferTracker::new(&mut *sink);
            tracker.begin(1, entry.size);
            tracker.start_file(&entry.name, entry.size);
            let result = self.session.get(&entry.path, &local, &mut tracker);
            tracker.complete_file(result.is_ok());
            tracker.end();
            result.map_err(|err| HostError::Transfer {
                file: entry.name.clone(),
                message: err.to_string(),
            })?;
            archives.push(local);
        }
        Ok(archives)
    }

    fn upload_world(
        &self,
        world: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<ProgressSnapshot, HostError> {
        let stats = scan_local(world);
        info!(
            "uploading {} files ({})",
            stats.files,
            format_size(stats.bytes)
        );
        let mut tracker = TransferTracker::new(sink);
        tracker.begin(stats.files, stats.bytes);
        mirror(
            self.session,
            MirrorSpec::Upload {
                local: world,
                remote: &self.layout.world_dir,
            },
            &mut tracker,
        )?;
        let summary = tracker.end();
        if summary.failed > 0 {
            warn!("{} file(s) failed to upload", summary.failed);
        }
        Ok(summary)
    }
}

fn describe(entry: &BackupEntry) -> String {
    format!(
        "{} ({}, {}, {})",
        entry.name,
        entry.kind,
        format_size(entry.size),
        entry.display_date()
    )
}
