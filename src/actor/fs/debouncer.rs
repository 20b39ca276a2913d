use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};
use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

use super::types::ChangeKind;

/// Default quiet period before a change is reported.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Map a raw notify event to a change, or `None` for noise.
///
/// Metadata-only changes (mtime/atime/chmod) and access events are ignored.
pub(super) fn classify(event: &notify::Event) -> Option<ChangeKind> {
    match event.kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => Some(ChangeKind::Created),
            RenameMode::From => Some(ChangeKind::Removed),
            _ => Some(ChangeKind::Renamed),
        },
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Single resettable timer plus the last path seen.
///
/// Every qualifying event pushes the deadline out by the full window; the
/// window fires once, with whatever path came last.
#[derive(Debug)]
pub(super) struct DebounceWindow {
    last_path: Option<PathBuf>,
    deadline: Option<Instant>,
}

impl DebounceWindow {
    pub(super) fn new() -> Self {
        Self {
            last_path: None,
            deadline: None,
        }
    }

    /// Record an event at `now`, restarting the window.
    pub(super) fn record(&mut self, path: PathBuf, window: Duration, now: Instant) {
        self.last_path = Some(path);
        self.deadline = Some(now + window);
    }

    pub(super) fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Channel that fires when the window expires (never, if idle).
    pub(super) fn timer(&self) -> Receiver<Instant> {
        match self.deadline {
            Some(deadline) => channel::at(deadline),
            None => channel::never(),
        }
    }

    /// Close the window if it has expired, yielding the last path.
    pub(super) fn take_if_due(&mut self, now: Instant) -> Option<PathBuf> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.last_path.take()
            }
            _ => None,
        }
    }

    /// Forget any pending change.
    pub(super) fn clear(&mut self) {
        self.deadline = None;
        self.last_path = None;
    }
}
