//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tierconf::{ChangeEvent, ChangeOp, ConfigError, EventSink, FileWatcher, WatchGuard};

/// Write `body` to `dir/name` and return the path.
pub fn write_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).expect("Failed to write test file");
    path
}

struct NoopGuard;

impl WatchGuard for NoopGuard {}

/// Watcher that never touches the filesystem. Tests fire events by hand.
#[derive(Clone, Default)]
pub struct ManualWatcher {
    sink: Arc<Mutex<Option<EventSink>>>,
    watched: Arc<Mutex<Option<PathBuf>>>,
}

impl ManualWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watched(&self) -> Option<PathBuf> {
        self.watched.lock().unwrap().clone()
    }

    /// Deliver an event as if the filesystem had produced it.
    pub fn fire(&self, op: ChangeOp) {
        let path = self.watched().expect("nothing is being watched");
        let sink = self.sink.lock().unwrap();
        let sink = sink.as_ref().expect("watch() was never called");
        sink(ChangeEvent::new(path, op));
    }
}

impl FileWatcher for ManualWatcher {
    fn watch(
        &self,
        path: &Path,
        _debounce: Duration,
        sink: EventSink,
    ) -> Result<Box<dyn WatchGuard>, ConfigError> {
        *self.sink.lock().unwrap() = Some(sink);
        *self.watched.lock().unwrap() = Some(path.to_path_buf());
        Ok(Box::new(NoopGuard))
    }
}

/// Watcher whose `watch` always fails.
pub struct BrokenWatcher;

impl FileWatcher for BrokenWatcher {
    fn watch(
        &self,
        path: &Path,
        _debounce: Duration,
        _sink: EventSink,
    ) -> Result<Box<dyn WatchGuard>, ConfigError> {
        Err(ConfigError::Watch {
            path: path.to_path_buf(),
            message: "watch limit reached".to_string(),
        })
    }
}

/// Poll `check` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    check()
}
