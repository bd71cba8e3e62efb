//! Change-notification fan-out.
//!
//! Every inbound [`ChangeEvent`] is logged (when debug is on), published on a
//! broadcast channel, and handed to each callback on its own thread. Callback
//! threads are tracked so owners can join them at shutdown with
//! [`ChangeNotifier::wait_for_callbacks`].
//!
//! There is no timeout and no backpressure: a callback that never returns
//! keeps its thread alive but never delays dispatch. Callbacks cannot be
//! unregistered.

use crate::watcher::ChangeEvent;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Callback invoked with each change event.
pub type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Capacity of the broadcast channel returned by `subscribe`.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Whether a store is subscribed to file changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching { path: PathBuf },
}

pub struct ChangeNotifier {
    /// Policy-level callback, fixed at construction.
    primary: Option<ChangeCallback>,
    callbacks: RwLock<Vec<ChangeCallback>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<ChangeEvent>,
    state: RwLock<WatchState>,
    debug: bool,
}

impl ChangeNotifier {
    pub fn new(primary: Option<ChangeCallback>, debug: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            primary,
            callbacks: RwLock::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            events,
            state: RwLock::new(WatchState::Idle),
            debug,
        }
    }

    /// Register another callback. Additive and unbounded.
    pub fn register(&self, callback: ChangeCallback) {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Receive every event dispatched from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> WatchState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Idle → Watching. Only the first transition takes effect.
    pub(crate) fn mark_watching(&self, path: PathBuf) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state != WatchState::Idle {
            return false;
        }
        *state = WatchState::Watching { path };
        true
    }

    /// Fan an event out to the channel and every callback.
    pub fn dispatch(&self, event: &ChangeEvent) {
        if self.debug {
            debug!(path = %event.path.display(), op = %event.op, "Config file changed");
        }

        // No subscribers is fine
        let _ = self.events.send(event.clone());

        let callbacks: Vec<ChangeCallback> = {
            let registered = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
            self.primary.iter().chain(registered.iter()).cloned().collect()
        };

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|handle| !handle.is_finished());
        for callback in callbacks {
            let event = event.clone();
            let spawned = std::thread::Builder::new()
                .name("tierconf-callback".to_string())
                .spawn(move || callback(&event));
            match spawned {
                Ok(handle) => tasks.push(handle),
                Err(e) => warn!("Failed to spawn config change callback: {}", e),
            }
        }
    }

    /// Callback threads that have not been joined yet.
    pub fn pending_callbacks(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|handle| !handle.is_finished());
        tasks.len()
    }

    /// Join every outstanding callback thread. Returns how many panicked.
    /// Blocks for as long as the slowest callback runs.
    pub fn wait_for_callbacks(&self) -> usize {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks.drain(..).collect()
        };
        let mut panicked = 0;
        for handle in handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            warn!(panicked, "Config change callbacks panicked");
        }
        panicked
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("primary", &self.primary.is_some())
            .field("callbacks", &self.callback_count())
            .field("state", &self.state())
            .finish()
    }
}
