use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TryRecvError};
use parking_lot::Mutex;

use super::{CLIENT_QUEUE_CAPACITY, HubHandle, Inbound, Transport};
use crate::actor::messages::{ClientId, HubMsg};
use crate::reload::message::Message;

type Shared<T> = Arc<Mutex<T>>;

impl HubHandle {
    /// Serve one connection until it ends.
    ///
    /// Registers the client, queues `connected`, then runs the read loop on
    /// the calling thread while a companion thread runs the write loop.
    /// When either loop ends the client is unregistered and the transport
    /// closed. Blocks for the lifetime of the connection.
    pub fn handle_connection<T: Transport>(&self, mut transport: T) {
        let id = self.next_client_id();
        let (outbound, queue) = channel::bounded(CLIENT_QUEUE_CAPACITY);

        // Queued before registration so it is always the first frame
        let _ = outbound.try_send(Message::Connected);

        if self
            .membership_tx
            .send(HubMsg::Register { id, outbound })
            .is_err()
        {
            crate::debug!("hub"; "hub stopped, rejecting client {}", id);
            transport.close();
            return;
        }

        let transport = Arc::new(Mutex::new(transport));
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);
        let (done_tx, done_rx) = channel::bounded::<()>(0);

        let writer = {
            let transport = Arc::clone(&transport);
            let keepalive = self.keepalive;
            thread::Builder::new()
                .name(format!("lectern-ws-{id}"))
                .spawn(move || {
                    write_loop(id, &transport, &queue, &cancel_rx, keepalive);
                    drop(done_tx);
                })
        };

        match writer {
            Ok(writer) => {
                read_loop(id, &transport, self, &done_rx);
                drop(cancel_tx);
                let _ = writer.join();
            }
            Err(e) => crate::log!("hub"; "failed to start writer for client {}: {}", id, e),
        }

        let _ = self.membership_tx.send(HubMsg::Unregister { id });
        transport.lock().close();
    }
}

/// Relay `slide` and `theme` frames into the broadcast queue until the peer
/// goes away or the write loop ends.
fn read_loop<T: Transport>(
    id: ClientId,
    transport: &Shared<T>,
    hub: &HubHandle,
    writer_done: &Receiver<()>,
) {
    loop {
        if !matches!(writer_done.try_recv(), Err(TryRecvError::Empty)) {
            return;
        }

        let inbound = transport.lock().recv();
        match inbound {
            Ok(Inbound::Text(text)) => match Message::from_json(&text) {
                Some(msg) if msg.is_relayable() => {
                    crate::debug!("hub"; "client {} sent {}", id, msg.kind());
                    hub.broadcast(msg);
                }
                _ => crate::debug!("hub"; "client {} sent ignored frame", id),
            },
            Ok(Inbound::Idle) => {}
            Ok(Inbound::Closed) => {
                crate::debug!("hub"; "client {} closed", id);
                return;
            }
            Err(e) => {
                crate::debug!("hub"; "client {} read failed: {}", id, e);
                return;
            }
        }
    }
}

/// Drain the client queue in order and keep the connection alive with
/// pings, until the queue closes, a send fails or `cancel` is dropped.
fn write_loop<T: Transport>(
    id: ClientId,
    transport: &Shared<T>,
    queue: &Receiver<Message>,
    cancel: &Receiver<()>,
    keepalive: Duration,
) {
    let ticker = channel::tick(keepalive);

    loop {
        channel::select! {
            recv(queue) -> msg => {
                let Ok(msg) = msg else {
                    crate::debug!("hub"; "client {} queue closed", id);
                    return;
                };
                if let Err(e) = transport.lock().send_text(&msg.to_json()) {
                    crate::debug!("hub"; "client {} write failed: {}", id, e);
                    return;
                }
            }
            recv(ticker) -> _ => {
                if let Err(e) = transport.lock().send_ping() {
                    crate::debug!("hub"; "client {} ping failed: {}", id, e);
                    return;
                }
            }
            recv(cancel) -> _ => return,
        }
    }
}
