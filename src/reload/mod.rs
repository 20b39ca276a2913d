//! Reload Module
//!
//! WebSocket side of the live preview.
//!
//! ```text
//! ChangeWatcher -> PresentationStore -> Hub -> Browser
//!   (notify)         (re-read)        (fan-out)
//! ```
//!
//! # Modules
//!
//! - `message` - wire messages (connected, reload, slide, theme)
//! - `server` - WebSocket listener handing connections to the hub

pub mod message;
pub mod server;
