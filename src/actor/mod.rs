//! Live preview actors
//!
//! ```text
//! ChangeWatcher ──> Coordinator ──> PresentationStore::reload ──> Hub ──> clients
//! (notify)          (wiring)        (arc-swap snapshot)          (fan-out)
//! ```
//!
//! # Module Structure
//!
//! - `fs` - Debounced watcher for the deck and its directory
//! - `ws` - Broadcast hub and per-connection I/O
//! - `messages` - Hub membership messages
//! - `coordinator` - Wires watcher, store and hub together

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;
