//! Change Watcher
//!
//! Watches one deck file and the directory holding it, plus any extra file
//! outside it, coalescing bursts of events into a single callback.
//!
//! # Module Structure
//!
//! - `types` - Change kinds and editor temp file detection
//! - `debouncer` - Event classification and the resettable debounce window
//! - `watch_roots` - Watch target and re-attachment after atomic saves
//!
//! # Loop
//!
//! ```text
//! notify ──► classify ──► DebounceWindow ──(quiet for window)──► on_change(last path)
//!                │
//!                └── rename/remove of the deck ──► rewatch in 100ms
//! ```
//!
//! One session owns one OS watcher and one loop thread. `stop` blocks until
//! the loop has exited and the OS watcher is released.

mod debouncer;
mod types;
mod watch_roots;


use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use notify::RecommendedWatcher;
use parking_lot::Mutex;
use thiserror::Error;

pub use debouncer::DEFAULT_DEBOUNCE;
pub use watch_roots::WatchTarget;

use crate::{debug, log};
use debouncer::{DebounceWindow, classify};
use types::is_temp_file;

/// Delay before re-adding the file watch after the deck was replaced.
const REWATCH_DELAY: Duration = Duration::from_millis(100);

/// Invoked on the loop thread with the last changed path of a burst.
pub type ChangeCallback = Arc<dyn Fn(&Path) + Send + Sync>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create file watcher: {0}")]
    Create(#[source] notify::Error),

    #[error("failed to watch {}: {source}", path.display())]
    Attach {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to spawn watch thread: {0}")]
    Thread(#[source] std::io::Error),
}

/// Settings read by the loop on every event.
struct Shared {
    on_change: Mutex<Option<ChangeCallback>>,
    debounce: Mutex<Duration>,
}

/// A running watch session.
struct Session {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Debounced watcher for a single deck.
pub struct ChangeWatcher {
    target: WatchTarget,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl ChangeWatcher {
    pub fn new(path: &Path) -> Self {
        Self::with_target(WatchTarget::new(path))
    }

    pub fn with_target(target: WatchTarget) -> Self {
        Self {
            target,
            shared: Arc::new(Shared {
                on_change: Mutex::new(None),
                debounce: Mutex::new(DEFAULT_DEBOUNCE),
            }),
            session: Mutex::new(None),
        }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// Replace the callback. Applies to the next burst.
    pub fn set_on_change(&self, callback: impl Fn(&Path) + Send + Sync + 'static) {
        *self.shared.on_change.lock() = Some(Arc::new(callback));
    }

    /// Change the debounce window. Applies from the next event.
    pub fn set_debounce_time(&self, window: Duration) {
        *self.shared.debounce.lock() = window;
    }

    pub fn debounce_time(&self) -> Duration {
        *self.shared.debounce.lock()
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Begin watching. Calling it on a running watcher is a no-op.
    pub fn start(&self) -> Result<(), WatchError> {
        let mut session = self.session.lock();
        if session.is_some() {
            return Ok(());
        }

        let (event_tx, event_rx) = channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        })
        .map_err(WatchError::Create)?;
        self.target.attach(&mut watcher)?;

        let (stop_tx, stop_rx) = channel::bounded(1);
        let watch_loop = WatchLoop {
            watcher,
            target: self.target.clone(),
            events: event_rx,
            stop: stop_rx,
            shared: Arc::clone(&self.shared),
            window: DebounceWindow::new(),
            rewatch_at: None,
        };

        let thread = thread::Builder::new()
            .name("lectern-watch".into())
            .spawn(move || watch_loop.run())
            .map_err(WatchError::Thread)?;

        debug!("watch"; "watching {}", self.target.file().display());
        *session = Some(Session { stop_tx, thread });
        Ok(())
    }

    /// Stop watching and wait for the loop to exit. Pending changes are
    /// dropped. Calling it on a stopped watcher is a no-op.
    pub fn stop(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };
        let _ = session.stop_tx.send(());

        // Called from inside the callback: the loop exits once it returns
        if session.thread.thread().id() == thread::current().id() {
            return;
        }
        if session.thread.join().is_err() {
            log!("watch"; "watch thread panicked");
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Event loop
// =============================================================================

struct WatchLoop {
    watcher: RecommendedWatcher,
    target: WatchTarget,
    events: Receiver<notify::Result<notify::Event>>,
    stop: Receiver<()>,
    shared: Arc<Shared>,
    window: DebounceWindow,
    rewatch_at: Option<Instant>,
}

impl WatchLoop {
    fn run(mut self) {
        let (stop, events) = (self.stop.clone(), self.events.clone());
        loop {
            let debounce_timer = self.window.timer();
            let rewatch_timer = match self.rewatch_at {
                Some(at) => channel::at(at),
                None => channel::never(),
            };

            channel::select! {
                recv(stop) -> _ => break,
                recv(events) -> msg => match msg {
                    Ok(Ok(event)) => self.on_event(&event),
                    Ok(Err(e)) => log!("watch"; "error: {}", e),
                    Err(_) => break,
                },
                recv(debounce_timer) -> _ => self.fire(),
                recv(rewatch_timer) -> _ => self.rewatch(),
            }
        }

        if self.window.is_pending() {
            debug!("watch"; "dropping pending change on stop");
        }
        self.window.clear();
        debug!("watch"; "stopped");
    }

    fn on_event(&mut self, event: &notify::Event) {
        let Some(kind) = classify(event) else {
            return;
        };
        let Some(path) = event.paths.last() else {
            return;
        };

        if kind.replaces_inode() && event.paths.iter().any(|p| self.target.is_file(p)) {
            self.rewatch_at = Some(Instant::now() + REWATCH_DELAY);
        }

        if is_temp_file(path) {
            return;
        }

        debug!("watch"; "{} {}", kind.label(), path.display());
        let window = *self.shared.debounce.lock();
        self.window.record(path.clone(), window, Instant::now());
    }

    fn fire(&mut self) {
        let Some(path) = self.window.take_if_due(Instant::now()) else {
            return;
        };
        let callback = self.shared.on_change.lock().clone();
        let Some(callback) = callback else {
            return;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| callback(&path))).is_err() {
            log!("watch"; "change handler panicked for {}", path.display());
        }
    }

    fn rewatch(&mut self) {
        self.rewatch_at = None;
        if self.target.rewatch(&mut self.watcher) {
            debug!("watch"; "re-attached {}", self.target.file().display());
        }
    }
}
