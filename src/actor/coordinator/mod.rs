//! Coordinator - wires the watcher to the hub
//!
//! ```text
//! ChangeWatcher ──(debounced path)──> PresentationStore::reload ──ok──> Hub: reload
//!                                                               └─err─> status line
//! ```
//!
//! A failed reload keeps the previous snapshot and sends nothing, so clients
//! never refetch a half-broken deck. A successful one re-applies
//! `[serve] debounce_ms`.
//!
//! The config file is watched too when it lives outside the deck directory
//! (found in a parent, or given with `--config`).

use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::fs::{ChangeWatcher, WatchError, WatchTarget};
use super::ws::HubHandle;
use crate::config::{Presentation, PresentationStore};
use crate::logger;
use crate::reload::message::Message;
use crate::utils::plural::plural_count;

/// Owns the watch session for one presentation.
pub struct Coordinator {
    store: Arc<PresentationStore>,
    hub: HubHandle,
    watcher: Arc<ChangeWatcher>,
}

impl Coordinator {
    pub fn new(store: Arc<PresentationStore>, hub: HubHandle) -> Self {
        let current = store.current();
        let mut target = WatchTarget::new(store.deck_path());
        if let Some(config_path) = &current.config.config_path {
            target = target.with_file(config_path);
        }

        let watcher = ChangeWatcher::with_target(target);
        watcher.set_debounce_time(current.config.serve.debounce());
        Self {
            store,
            hub,
            watcher: Arc::new(watcher),
        }
    }

    /// Start watching; every settled change reloads and notifies clients.
    pub fn start(&self) -> Result<(), WatchError> {
        let store = Arc::clone(&self.store);
        let hub = self.hub.clone();
        // Weak: the callback lives inside the watcher
        let watcher: Weak<ChangeWatcher> = Arc::downgrade(&self.watcher);
        self.watcher.set_on_change(move |path| {
            let Some(presentation) = on_change(&store, &hub, path) else {
                return;
            };
            if let Some(watcher) = watcher.upgrade() {
                watcher.set_debounce_time(presentation.config.serve.debounce());
            }
        });
        self.watcher.start()
    }

    pub fn debounce_time(&self) -> Duration {
        self.watcher.debounce_time()
    }

    pub fn watch_target(&self) -> &WatchTarget {
        self.watcher.target()
    }

    pub fn stop(&self) {
        self.watcher.stop();
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_running()
    }
}

fn on_change(store: &PresentationStore, hub: &HubHandle, path: &Path) -> Option<Arc<Presentation>> {
    let name = display_name(store, path);

    match store.reload() {
        Ok(presentation) => {
            hub.broadcast(Message::Reload);
            let clients = hub.client_count();
            logger::status_success(&format!(
                "{} changed, notified {}",
                name,
                plural_count(clients, "client")
            ));
            Some(presentation)
        }
        Err(e) => {
            logger::status_error(
                &format!("{name} changed, reload failed"),
                &format!("{e:#}"),
            );
            None
        }
    }
}

/// Path relative to the deck directory when possible.
fn display_name(store: &PresentationStore, path: &Path) -> String {
    let dir = store.deck_path().parent().unwrap_or(Path::new(""));
    path.strip_prefix(dir)
        .unwrap_or(path)
        .display()
        .to_string()
}
