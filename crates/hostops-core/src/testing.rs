use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::errors::{ApiError, HostError, RemoteError};
use crate::power::{PowerAction, PowerApi, ServerPowerState};
use crate::progress::{ProgressSink, ProgressSnapshot};
use crate::prompt::Prompter;
use crate::remote::{EntryKind, RemoteEntry, RemoteSession, TransferObserver};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("hostops-{prefix}-{nanos}-{seq}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let file = std::fs::File::create(path).expect("create zip");
    let mut writer = ZipWriter::new(file);
    for (name, contents) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("write zip entry");
    }
    writer.finish().expect("finish zip");
}

#[derive(Debug, Clone)]
enum Node {
    Dir { modified: u64 },
    File { data: Vec<u8>, modified: u64 },
}

/// In-memory remote filesystem. Paths are absolute and `/`-separated.
#[derive(Default)]
pub struct MemoryRemote {
    nodes: RefCell<BTreeMap<String, Node>>,
    failing: RefCell<BTreeSet<String>>,
    short_reports: RefCell<BTreeMap<String, u64>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote
            .nodes
            .borrow_mut()
            .insert("/".to_string(), Node::Dir { modified: 0 });
        remote
    }

    pub fn add_dir(&self, path: &str) {
        let mut current = String::new();
        for part in path.split('/').filter(|part| !part.is_empty()) {
            current = format!("{current}/{part}");
            self.nodes
                .borrow_mut()
                .entry(current.clone())
                .or_insert(Node::Dir { modified: 0 });
        }
    }

    pub fn add_file(&self, path: &str, contents: &[u8]) {
        self.add_file_at(path, contents, 0);
    }

    pub fn add_file_at(&self, path: &str, contents: &[u8], modified: u64) {
        if let Some(parent) = parent_of(path) {
            self.add_dir(&parent);
        }
        self.nodes.borrow_mut().insert(
            path.to_string(),
            Node::File {
                data: contents.to_vec(),
                modified,
            },
        );
    }

    /// Every transfer touching `path` fails.
    pub fn fail_on(&self, path: &str) {
        self.failing.borrow_mut().insert(path.to_string());
    }

    /// Downloads of `path` report `shortfall` bytes fewer than they write.
    pub fn report_short(&self, path: &str, shortfall: u64) {
        self.short_reports
            .borrow_mut()
            .insert(path.to_string(), shortfall);
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.borrow().get(path) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.borrow().contains_key(path)
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.nodes
            .borrow()
            .iter()
            .filter(|(_, node)| matches!(node, Node::File { .. }))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn check_failing(&self, path: &str) -> Result<(), RemoteError> {
        if self.failing.borrow().contains(path) {
            return Err(RemoteError::io(path, "injected failure"));
        }
        Ok(())
    }

    fn entry_for(path: &str, node: &Node) -> RemoteEntry {
        let name = path.rsplit('/').next().unwrap_or_default().to_string();
        match node {
            Node::Dir { modified } => RemoteEntry {
                name,
                path: path.to_string(),
                size: 0,
                modified: *modified,
                kind: EntryKind::Dir,
            },
            Node::File { data, modified } => RemoteEntry {
                name,
                path: path.to_string(),
                size: data.len() as u64,
                modified: *modified,
                kind: EntryKind::File,
            },
        }
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(path: &str) -> Option<String> {
    let (parent, _) = path.rsplit_once('/')?;
    if parent.is_empty() {
        None
    } else {
        Some(parent.to_string())
    }
}

impl RemoteSession for MemoryRemote {
    fn stat(&self, path: &str) -> Result<RemoteEntry, RemoteError> {
        let path = normalize(path);
        self.nodes
            .borrow()
            .get(&path)
            .map(|node| Self::entry_for(&path, node))
            .ok_or(RemoteError::NotFound(path))
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let path = normalize(path);
        let nodes = self.nodes.borrow();
        match nodes.get(&path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => return Err(RemoteError::io(&path, "not a directory")),
            None => return Err(RemoteError::NotFound(path)),
        }
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        Ok(nodes
            .iter()
            .filter(|(candidate, _)| {
                candidate.len() > prefix.len()
                    && candidate.starts_with(&prefix)
                    && !candidate[prefix.len()..].contains('/')
            })
            .map(|(candidate, node)| Self::entry_for(candidate, node))
            .collect())
    }

    fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        let path = normalize(path);
        if self.nodes.borrow().contains_key(&path) {
            return Err(RemoteError::io(&path, "already exists"));
        }
        if let Some(parent) = parent_of(&path) {
            if !self.nodes.borrow().contains_key(&parent) {
                return Err(RemoteError::NotFound(parent));
            }
        }
        self.nodes
            .borrow_mut()
            .insert(path, Node::Dir { modified: 0 });
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<(), RemoteError> {
        let path = normalize(path);
        self.check_failing(&path)?;
        match self.nodes.borrow_mut().remove(&path) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(path)),
        }
    }

    fn remove_dir(&self, path: &str) -> Result<(), RemoteError> {
        let path = normalize(path);
        if !self.list(&path)?.is_empty() {
            return Err(RemoteError::io(&path, "directory not empty"));
        }
        self.nodes.borrow_mut().remove(&path);
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let path = normalize(path);
        self.check_failing(&path)?;
        self.contents(&path).ok_or(RemoteError::NotFound(path))
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<(), RemoteError> {
        let path = normalize(path);
        self.check_failing(&path)?;
        self.add_file(&path, contents);
        Ok(())
    }

    fn get(
        &self,
        remote: &str,
        local: &Path,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError> {
        let remote = normalize(remote);
        self.check_failing(&remote)?;
        let data = self
            .contents(&remote)
            .ok_or_else(|| RemoteError::NotFound(remote.clone()))?;
        let shortfall = self
            .short_reports
            .borrow()
            .get(&remote)
            .copied()
            .unwrap_or(0);
        let reported = (data.len() as u64).saturating_sub(shortfall);
        observer.on_progress(reported / 2);
        observer.on_progress(reported);
        std::fs::write(local, &data).map_err(|err| RemoteError::io(&remote, err))?;
        Ok(data.len() as u64)
    }

    fn put(
        &self,
        local: &Path,
        remote: &str,
        observer: &mut dyn TransferObserver,
    ) -> Result<u64, RemoteError> {
        let remote = normalize(remote);
        self.check_failing(&remote)?;
        if let Some(parent) = parent_of(&remote) {
            if !self.nodes.borrow().contains_key(&parent) {
                return Err(RemoteError::NotFound(parent));
            }
        }
        let data = std::fs::read(local).map_err(|err| RemoteError::io(&remote, err))?;
        observer.on_progress(data.len() as u64);
        let size = data.len() as u64;
        self.nodes
            .borrow_mut()
            .insert(remote, Node::File { data, modified: 0 });
        Ok(size)
    }
}

/// Power API that replays a scripted state sequence and records every action.
pub struct ScriptedPower {
    states: RefCell<VecDeque<ServerPowerState>>,
    /// Returned once the script runs out.
    pub settled: ServerPowerState,
    /// State reported after a kill signal, if any.
    pub after_kill: Option<ServerPowerState>,
    /// Every state query fails with this HTTP status.
    pub failing_status: Option<u16>,
    pub actions: RefCell<Vec<PowerAction>>,
    pub commands: RefCell<Vec<String>>,
    pub queries: RefCell<usize>,
}

impl ScriptedPower {
    pub fn new(states: &[ServerPowerState], settled: ServerPowerState) -> Self {
        Self {
            states: RefCell::new(states.iter().copied().collect()),
            settled,
            after_kill: None,
            failing_status: None,
            actions: RefCell::new(Vec::new()),
            commands: RefCell::new(Vec::new()),
            queries: RefCell::new(0),
        }
    }

    pub fn always(state: ServerPowerState) -> Self {
        Self::new(&[], state)
    }

    pub fn failing(status: u16) -> Self {
        Self {
            failing_status: Some(status),
            ..Self::always(ServerPowerState::Running)
        }
    }

    pub fn actions(&self) -> Vec<PowerAction> {
        self.actions.borrow().clone()
    }

    pub fn count(&self, action: PowerAction) -> usize {
        self.actions
            .borrow()
            .iter()
            .filter(|recorded| **recorded == action)
            .count()
    }
}

impl PowerApi for ScriptedPower {
    fn query_state(&self) -> Result<ServerPowerState, ApiError> {
        *self.queries.borrow_mut() += 1;
        if let Some(status) = self.failing_status {
            return Err(match status {
                401 | 403 => ApiError::Unauthorized(status),
                _ => ApiError::Status {
                    status,
                    body: String::new(),
                },
            });
        }
        if let Some(state) = self.states.borrow_mut().pop_front() {
            return Ok(state);
        }
        if self.count(PowerAction::Kill) > 0 {
            if let Some(state) = self.after_kill {
                return Ok(state);
            }
        }
        Ok(self.settled)
    }

    fn send_power(&self, action: PowerAction) -> Result<(), ApiError> {
        self.actions.borrow_mut().push(action);
        Ok(())
    }

    fn send_command(&self, command: &str) -> Result<(), ApiError> {
        self.commands.borrow_mut().push(command.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub started: Vec<(String, u64)>,
    pub finished: Vec<bool>,
    pub overall: Vec<ProgressSnapshot>,
    pub sessions_started: usize,
    pub sessions_finished: usize,
}

impl ProgressSink for RecordingSink {
    fn session_started(&mut self, _snapshot: &ProgressSnapshot) {
        self.sessions_started += 1;
    }

    fn file_started(&mut self, name: &str, size: u64) {
        self.started.push((name.to_string(), size));
    }

    fn file_finished(&mut self, success: bool) {
        self.finished.push(success);
    }

    fn overall(&mut self, snapshot: &ProgressSnapshot) {
        self.overall.push(*snapshot);
    }

    fn session_finished(&mut self, _snapshot: &ProgressSnapshot) {
        self.sessions_finished += 1;
    }
}

/// Prompter with canned answers. Confirmations default to `true` once the
/// script runs out.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    pub answers: VecDeque<bool>,
    pub choices: VecDeque<usize>,
    pub messages: Vec<String>,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn choosing(choice: usize) -> Self {
        Self {
            choices: VecDeque::from([choice]),
            ..Self::default()
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, message: &str) -> Result<bool, HostError> {
        self.messages.push(message.to_string());
        Ok(self.answers.pop_front().unwrap_or(true))
    }

    fn choose(&mut self, prompt: &str, _items: &[String]) -> Result<usize, HostError> {
        self.messages.push(prompt.to_string());
        self.choices
            .pop_front()
            .ok_or_else(|| HostError::Cancelled(prompt.to_string()))
    }
}
