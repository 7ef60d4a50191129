use std::fmt;

use tracing::{info, warn};

use crate::errors::HostError;
use crate::layout::RemoteLayout;
use crate::lifecycle::{LifecycleController, StopOutcome, WaitPolicy};
use crate::power::{PowerAction, PowerApi, ServerPowerState};
use crate::presets::{PRESETS, WorldPreset, find_preset};
use crate::prompt::{Prompter, require_confirmation};
use crate::properties::update_remote_properties;
use crate::remote::RemoteSession;
use crate::walker::remove_tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateStep {
    Confirming,
    StoppingIfRunning,
    DeletingWorldData,
    PatchingConfig,
    Starting,
    Done,
    Aborted,
}

impl fmt::Display for RegenerateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Confirming => "confirming regeneration",
            Self::StoppingIfRunning => "stopping server",
            Self::DeletingWorldData => "deleting world data",
            Self::PatchingConfig => "updating server.properties",
            Self::Starting => "starting server",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegenerateRequest {
    /// Preset key; prompted for when absent.
    pub preset: Option<String>,
    /// Empty means a random seed.
    pub seed: String,
}

#[derive(Debug, Clone)]
pub struct RegenerateReport {
    pub preset: &'static WorldPreset,
    pub seed: String,
    pub stop: StopOutcome,
    pub deleted: bool,
}

pub struct RegenerateWorkflow<'a, P> {
    session: &'a dyn RemoteSession,
    lifecycle: &'a LifecycleController<P>,
    layout: &'a RemoteLayout,
    policy: WaitPolicy,
    step: RegenerateStep,
}

impl<'a, P: PowerApi> RegenerateWorkflow<'a, P> {
    pub fn new(
        session: &'a dyn RemoteSession,
        lifecycle: &'a LifecycleController<P>,
        layout: &'a RemoteLayout,
    ) -> Self {
        Self {
            session,
            lifecycle,
            layout,
            policy: WaitPolicy::regenerate(),
            step: RegenerateStep::Confirming,
        }
    }

    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn step(&self) -> RegenerateStep {
        self.step
    }

    pub fn run(
        &mut self,
        request: &RegenerateRequest,
        prompter: &mut dyn Prompter,
    ) -> Result<RegenerateReport, HostError> {
        match self.execute(request, prompter) {
            Ok(report) => {
                self.enter(RegenerateStep::Done);
                Ok(report)
            }
            Err(err) => {
                let failed = self.step;
                self.step = RegenerateStep::Aborted;
                warn!("regeneration aborted while {failed}: {err}");
                Err(err.at(failed))
            }
        }
    }

    fn enter(&mut self, step: RegenerateStep) {
        info!("regenerate: {step}");
        self.step = step;
    }

    fn execute(
        &mut self,
        request: &RegenerateRequest,
        prompter: &mut dyn Prompter,
    ) -> Result<RegenerateReport, HostError> {
        self.enter(RegenerateStep::Confirming);
        let preset = match request.preset.as_deref() {
            Some(key) => find_preset(key)?,
            None => {
                let items = PRESETS
                    .iter()
                    .map(|preset| format!("{} - {} ({})", preset.key, preset.name, preset.short_type()))
                    .collect::<Vec<_>>();
                let choice = prompter.choose("Select world type", &items)?;
                PRESETS.get(choice).ok_or(HostError::InvalidSelection {
                    index: choice + 1,
                    max: PRESETS.len(),
                })?
            }
        };
        let seed_label = if request.seed.is_empty() {
            "(random)"
        } else {
            request.seed.as_str()
        };
        let message = format!(
            "DELETE the current world and regenerate as {} ({}), seed {seed_label}? All builds and player progress will be lost.",
            preset.name, preset.level_type
        );
        require_confirmation(prompter, RegenerateStep::Confirming, &message)?;

        self.enter(RegenerateStep::StoppingIfRunning);
        let state = self.lifecycle.observe();
        let stop = match state {
            ServerPowerState::Offline => StopOutcome::AlreadyOffline,
            state if state.is_active() => self.lifecycle.wait_from(state, &self.policy)?,
            state => {
                info!("server is {state}, not stopping it");
                StopOutcome::NotRunning
            }
        };

        self.enter(RegenerateStep::DeletingWorldData);
        let deleted = remove_tree(self.session, &self.layout.world_dir)?;
        if !deleted {
            info!("{} does not exist, nothing to delete", self.layout.world_dir);
        }

        self.enter(RegenerateStep::PatchingConfig);
        let settings = preset.generator_settings();
        update_remote_properties(
            self.session,
            &self.layout.properties_path,
            &[
                ("level-type", preset.level_type),
                ("level-seed", request.seed.as_str()),
                ("generator-settings", settings.as_str()),
            ],
        )?;

        self.enter(RegenerateStep::Starting);
        self.lifecycle.send_power(PowerAction::Start)?;

        Ok(RegenerateReport {
            preset,
            seed: request.seed.clone(),
            stop,
            deleted,
        })
    }
}
