//! Operations engine for a remotely hosted game server: transfers with progress
//! accounting, backup catalog and restore, world regeneration and the smaller
//! maintenance workflows around them.
//!
//! Nothing here opens a network connection. Callers provide a
//! [`RemoteSession`] for file access and a [`PowerApi`] for the hosting panel.

pub mod archive;
pub mod catalog;
pub mod chain;
pub mod deploy;
pub mod errors;
pub mod layout;
pub mod lifecycle;
pub mod local_mode;
pub mod power;
pub mod presets;
pub mod progress;
pub mod prompt;
pub mod properties;
pub mod regenerate;
pub mod remote;
pub mod restore;
pub mod walker;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{BackupEntry, BackupKind, BackupLocations, BackupRequest};
pub use chain::RestoreChain;
pub use errors::{ApiError, HostError, RemoteError};
pub use layout::{RemoteDirectorySpec, RemoteLayout};
pub use lifecycle::{LifecycleController, StopOutcome, WaitPolicy};
pub use local_mode::LocalMode;
pub use power::{PowerAction, PowerApi, ServerPowerState};
pub use progress::{ProgressSink, ProgressSnapshot, SilentSink, TransferTracker};
pub use prompt::{AutoConfirm, Prompter};
pub use regenerate::{RegenerateRequest, RegenerateWorkflow};
pub use remote::{EntryKind, RemoteEntry, RemoteSession, TransferObserver};
pub use restore::{RestoreStep, RestoreWorkflow};
pub use world::WorldDownloadPlan;
