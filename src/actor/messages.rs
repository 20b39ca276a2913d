//! Actor Message Definitions
//!
//! ```text
//! accept thread --Register/Unregister--> Hub <--Message-- watcher, clients
//! ```

use crossbeam::channel::Sender;

use crate::reload::message::Message;

/// Identifier handed out per accepted connection.
pub type ClientId = u64;

/// Membership changes, applied in order by the hub loop.
#[derive(Debug)]
pub enum HubMsg {
    /// Add a client; `outbound` is its private queue.
    Register {
        id: ClientId,
        outbound: Sender<Message>,
    },
    /// Remove a client; dropping its queue ends the write loop.
    Unregister { id: ClientId },
}
