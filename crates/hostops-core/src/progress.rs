//! Aggregate byte accounting for multi-file transfers.
//!
//! A [`TransferTracker`] owns all counters for one logical operation. Rendering is
//! delegated to a [`ProgressSink`]; the tracker itself performs no I/O.

use crate::remote::TransferObserver;

/// Point-in-time view of a transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub total_files: u64,
    pub total_bytes: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Bytes accounted for so far, never above `total_bytes`.
    pub transferred: u64,
}

impl ProgressSnapshot {
    pub fn files_done(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Whether an overall bar is meaningful. Single-file sessions only show the file.
    pub fn is_aggregate(&self) -> bool {
        self.total_files > 1
    }
}

/// Presentation hooks. Every method has a no-op default so sinks only implement
/// what they render.
pub trait ProgressSink {
    fn session_started(&mut self, _snapshot: &ProgressSnapshot) {}
    fn file_started(&mut self, _name: &str, _size: u64) {}
    fn file_progress(&mut self, _transferred: u64) {}
    fn file_finished(&mut self, _success: bool) {}
    fn overall(&mut self, _snapshot: &ProgressSnapshot) {}
    fn session_finished(&mut self, _snapshot: &ProgressSnapshot) {}
}

/// Sink that renders nothing.
#[derive(Debug, Default)]
pub struct SilentSink;

impl ProgressSink for SilentSink {}

#[derive(Debug)]
struct CurrentFile {
    size: u64,
    completed: u64,
}

pub struct TransferTracker<'a> {
    sink: &'a mut dyn ProgressSink,
    snapshot: ProgressSnapshot,
    current: Option<CurrentFile>,
}

impl<'a> TransferTracker<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink,
            snapshot: ProgressSnapshot::default(),
            current: None,
        }
    }

    pub fn begin(&mut self, total_files: u64, total_bytes: u64) {
        self.snapshot = ProgressSnapshot {
            total_files,
            total_bytes,
            ..ProgressSnapshot::default()
        };
        self.current = None;
        self.sink.session_started(&self.snapshot);
    }

    pub fn start_file(&mut self, name: &str, size: u64) {
        self.current = Some(CurrentFile { size, completed: 0 });
        self.sink.file_started(name, size);
    }

    /// Record the cumulative byte count of the current file. Stale or repeated
    /// values are ignored so the aggregate never moves backwards.
    pub fn update(&mut self, transferred: u64) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        self.sink.file_progress(transferred);
        if transferred <= current.completed {
            return;
        }
        let delta = transferred - current.completed;
        current.completed = transferred;
        self.account(delta);
        self.sink.overall(&self.snapshot);
    }

    /// Close the current file. Whatever part of its declared size was not seen
    /// through `update` is folded into the aggregate, so the session reaches its
    /// total whether files succeed or fail.
    pub fn complete_file(&mut self, success: bool) {
        if let Some(current) = self.current.take() {
            let remaining = current.size.saturating_sub(current.completed);
            self.account(remaining);
        }
        if success {
            self.snapshot.succeeded += 1;
        } else {
            self.snapshot.failed += 1;
        }
        self.sink.file_finished(success);
        self.sink.overall(&self.snapshot);
    }

    pub fn end(&mut self) -> ProgressSnapshot {
        self.current = None;
        self.sink.session_finished(&self.snapshot);
        self.snapshot
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot
    }

    fn account(&mut self, bytes: u64) {
        self.snapshot.transferred = self
            .snapshot
            .transferred
            .saturating_add(bytes)
            .min(self.snapshot.total_bytes);
    }
}

impl TransferObserver for TransferTracker<'_> {
    fn on_progress(&mut self, transferred: u64) {
        self.update(transferred);
    }
}

/// Shorten a display name to at most `max` characters, keeping the tail.
pub fn truncate_display_name(name: &str, max: usize) -> String {
    let count = name.chars().count();
    if count <= max || max <= 3 {
        return name.to_string();
    }
    let keep = max - 3;
    let tail: String = name.chars().skip(count - keep).collect();
    format!("...{tail}")
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let value = bytes as f64;
    if value > GB {
        format!("{:.2} GB", value / GB)
    } else if value > MB {
        format!("{:.1} MB", value / MB)
    } else if value > KB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{bytes} B")
    }
}
