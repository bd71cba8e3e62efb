//! File watcher for the located config file.
//!
//! Watches the file's parent directory (editors often replace files rather
//! than writing in place) and forwards events that touch the config file.
//! Uses debouncing to coalesce rapid saves into one event.

use crate::error::ConfigError;
use notify::Watcher;
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, new_debouncer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, error, info};

/// What happened to the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOp {
    Write,
    Rename,
    Remove,
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOp::Write => write!(f, "WRITE"),
            ChangeOp::Rename => write!(f, "RENAME"),
            ChangeOp::Remove => write!(f, "REMOVE"),
        }
    }
}

/// A change to the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub op: ChangeOp,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, op: ChangeOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// True if the file layer should be re-read.
    pub fn requires_reload(&self) -> bool {
        self.op == ChangeOp::Write
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.path.display().to_string(), self.op)
    }
}

/// Receives events from a watcher. Called on the watcher's own thread.
pub type EventSink = Box<dyn Fn(ChangeEvent) + Send + Sync>;

/// Keeps a watch alive; dropping it stops the watch.
pub trait WatchGuard: Send {}

/// Subscribes to change events for a single file.
pub trait FileWatcher: Send + Sync {
    fn watch(
        &self,
        path: &Path,
        debounce: Duration,
        sink: EventSink,
    ) -> Result<Box<dyn WatchGuard>, ConfigError>;
}

/// [`FileWatcher`] backed by `notify` with debouncing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyWatcher;

struct NotifyGuard {
    _thread: std::thread::JoinHandle<()>,
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl WatchGuard for NotifyGuard {}

impl FileWatcher for NotifyWatcher {
    fn watch(
        &self,
        path: &Path,
        debounce: Duration,
        sink: EventSink,
    ) -> Result<Box<dyn WatchGuard>, ConfigError> {
        let watch_err = |e: &dyn fmt::Display| ConfigError::Watch {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let file = path
            .canonicalize()
            .map_err(|e| ConfigError::io(path, e))?;
        let dir = file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| watch_err(&"config file has no parent directory"))?;

        let (notify_tx, notify_rx) = mpsc::channel();
        let mut debouncer = new_debouncer(debounce, notify_tx).map_err(|e| watch_err(&e))?;
        debouncer
            .watcher()
            .watch(&dir, notify::RecursiveMode::NonRecursive)
            .map_err(|e| watch_err(&e))?;
        info!("Watching config file: {}", file.display());

        let thread = std::thread::Builder::new()
            .name("tierconf-watch".to_string())
            .spawn(move || process_notify_events(notify_rx, &file, sink))
            .map_err(|e| ConfigError::io(path, e))?;

        Ok(Box::new(NotifyGuard {
            _thread: thread,
            _debouncer: debouncer,
        }))
    }
}

/// Forward debounced events for `file` until the debouncer is dropped.
fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    file: &Path,
    sink: EventSink,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                for event in classify_events(events, file) {
                    debug!("Config change detected: {}", event);
                    sink(event);
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
            }
            Err(_) => {
                // Debouncer dropped with the store
                info!("Config watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Keep only events for the watched file, at most one per batch.
fn classify_events(
    events: Vec<DebouncedEvent>,
    file: &Path,
) -> Option<ChangeEvent> {
    let touched = events.into_iter().any(|event| {
        matches!(
            event.kind,
            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
        ) && same_file(&event.path, file)
    });
    touched.then(|| classify_path(file))
}

fn same_file(candidate: &Path, file: &Path) -> bool {
    candidate == file
        || candidate
            .canonicalize()
            .map(|c| c == file)
            .unwrap_or_else(|_| candidate.file_name() == file.file_name())
}

/// Debounced events carry no kind, so the op is inferred from what is on
/// disk once the burst settles.
fn classify_path(file: &Path) -> ChangeEvent {
    let op = if file.exists() {
        ChangeOp::Write
    } else {
        ChangeOp::Remove
    };
    ChangeEvent::new(file, op)
}
