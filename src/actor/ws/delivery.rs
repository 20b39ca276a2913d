use crossbeam::channel::TrySendError;

use super::Hub;
use crate::reload::message::Message;

impl Hub {
    /// Copy `msg` into every client queue without blocking.
    ///
    /// A full queue loses this one message for that client only. A
    /// disconnected queue means its write loop is gone, so the client is
    /// dropped now rather than waiting for its unregistration.
    pub(super) fn fan_out(&mut self, msg: &Message) {
        if self.clients.is_empty() {
            crate::debug!("hub"; "no clients connected");
            return;
        }

        let mut full = 0;
        self.clients.retain(|id, outbound| match outbound.try_send(msg.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                full += 1;
                crate::debug!("hub"; "client {} queue full, dropped {}", id, msg.kind());
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                crate::debug!("hub"; "client {} gone", id);
                false
            }
        });
        self.sync_count();

        crate::debug!(
            "hub"; "{} to {} clients ({} dropped)",
            msg.kind(),
            self.clients.len(),
            full
        );
    }
}
