use std::path::Path;

use crate::errors::RemoteError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One directory entry or `stat` result on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub modified: u64,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Receives cumulative byte counts for the file currently being transferred.
pub trait TransferObserver {
    fn on_progress(&mut self, transferred: u64);
}

/// File-transfer capability of the game host. One connected session is built per
/// invocation and borrowed by every component that touches remote files.
pub trait RemoteSession {
    fn stat(&self, path: &str) -> Result<RemoteEntry, RemoteError>;
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;
    fn mkdir(&self, path: &str) -> Result<(), RemoteError>;
    fn remove_file(&self, path: &str) -> Result<(), RemoteError>;
    fn remove_dir(&self, path: &str) -> Result<(), RemoteError>;
    fn read(&self, path: &str) -> Result<Vec<u8>, RemoteError>;
    fn write(&self, path: &str, contents: &[u8]) -> Result<(), RemoteError>;

    /// Download `remote` into `local`, returning the number of bytes written.
    fn get(
        &self,
        remote: &str,
        local: &Path,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError>;

    /// Upload `local` to `remote`, returning the number of bytes sent.
    fn put(
        &self,
        local: &Path,
        remote: &str,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError>;

    /// Create a directory, treating an existing directory as success.
    fn ensure_dir(&self, path: &str) -> Result<(), RemoteError> {
        match self.mkdir(path) {
            Ok(()) => Ok(()),
            Err(err) => match self.stat(path) {
                Ok(entry) if entry.is_dir() => Ok(()),
                _ => Err(err),
            },
        }
    }
}

pub fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() {
        return name.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), name.trim_start_matches('/'))
}
