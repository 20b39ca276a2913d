//! Broadcast Hub - live preview clients
//!
//! The hub owns the set of connected clients. Registrations,
//! unregistrations and broadcasts all funnel through one coordinating loop,
//! so the client set has a single owner and needs no lock.
//!
//! # Architecture
//!
//! ```text
//!                  Register/Unregister (unbounded)
//! accept thread ─────────────────────────────┐
//!                                             v
//! watcher ──reload──> broadcast (64) ──────> Hub ──try_send──> client queue (256)
//!    ^                                                              │
//!    └──────── slide/theme relayed by read loop        write loop ─┘──> socket
//! ```
//!
//! # Modules
//!
//! - `client_io` - per-connection read and write loops
//! - `delivery` - fan-out into client queues
//! - `transport` - `Transport` trait and its tungstenite implementation

mod client_io;
mod delivery;
pub mod transport;


use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam::channel::Sender;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, watch};

pub use transport::{Inbound, Transport, TransportError};

use super::messages::{ClientId, HubMsg};
use crate::reload::message::Message;

/// Capacity of the shared broadcast queue.
pub const BROADCAST_CAPACITY: usize = 64;

/// Capacity of each client's private outbound queue.
pub const CLIENT_QUEUE_CAPACITY: usize = 256;

/// Interval between keepalive pings.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Coordinating loop state. Consumed by [`Hub::run`].
pub struct Hub {
    membership_rx: mpsc::UnboundedReceiver<HubMsg>,
    broadcast_rx: mpsc::Receiver<Message>,
    stop_rx: watch::Receiver<bool>,
    clients: FxHashMap<ClientId, Sender<Message>>,
    count: Arc<AtomicUsize>,
}

/// Cloneable front door to a running hub.
#[derive(Clone)]
pub struct HubHandle {
    membership_tx: mpsc::UnboundedSender<HubMsg>,
    broadcast_tx: mpsc::Sender<Message>,
    stop_tx: Arc<watch::Sender<bool>>,
    count: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
    keepalive: Duration,
}

impl Hub {
    pub fn new() -> (Self, HubHandle) {
        Self::with_keepalive(KEEPALIVE_INTERVAL)
    }

    pub fn with_keepalive(keepalive: Duration) -> (Self, HubHandle) {
        let (membership_tx, membership_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_CAPACITY);
        let (stop_tx, stop_rx) = watch::channel(false);
        let count = Arc::new(AtomicUsize::new(0));

        let hub = Self {
            membership_rx,
            broadcast_rx,
            stop_rx,
            clients: FxHashMap::default(),
            count: Arc::clone(&count),
        };
        let handle = HubHandle {
            membership_tx,
            broadcast_tx,
            stop_tx: Arc::new(stop_tx),
            count,
            next_id: Arc::new(AtomicU64::new(1)),
            keepalive,
        };
        (hub, handle)
    }

    /// Run the coordinating loop until stopped or every handle is gone.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                _ = self.stop_rx.changed() => break,

                Some(msg) = self.membership_rx.recv() => self.apply(msg),

                Some(msg) = self.broadcast_rx.recv() => self.fan_out(&msg),

                else => break,
            }
        }
        self.shutdown();
    }

    fn apply(&mut self, msg: HubMsg) {
        match msg {
            HubMsg::Register { id, outbound } => {
                self.clients.insert(id, outbound);
                crate::debug!("hub"; "client {} registered (total: {})", id, self.clients.len());
            }
            HubMsg::Unregister { id } => {
                if self.clients.remove(&id).is_some() {
                    crate::debug!("hub"; "client {} unregistered (total: {})", id, self.clients.len());
                }
            }
        }
        self.sync_count();
    }

    /// Close every client queue and forget all clients.
    fn shutdown(&mut self) {
        crate::debug!("hub"; "shutting down ({} clients)", self.clients.len());
        self.clients.clear();
        self.sync_count();
    }

    fn sync_count(&self) {
        self.count.store(self.clients.len(), Ordering::SeqCst);
    }
}

impl HubHandle {
    /// Queue `msg` for every client. Returns `false` if the broadcast queue
    /// is saturated or the hub has stopped, in which case it is dropped.
    pub fn broadcast(&self, msg: Message) -> bool {
        match self.broadcast_tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                crate::debug!("hub"; "broadcast queue full, dropped {}", msg.kind());
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn client_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Ask the hub loop to close every client and exit.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow() || self.membership_tx.is_closed()
    }

    fn next_client_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}
