//! Connection transport seen by the hub.
//!
//! The hub never touches sockets directly. Anything that can receive text
//! frames, send text and pings, and close can be a client.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use thiserror::Error;
use tungstenite::WebSocket;
use tungstenite::protocol::Message as WsMessage;

/// How long one `recv` may block before reporting [`Inbound::Idle`].
pub const READ_POLL: Duration = Duration::from_millis(50);

/// Result of one receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// Nothing arrived within the poll interval.
    Idle,
    /// Peer closed the connection.
    Closed,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("connection closed")]
    Closed,
}

pub trait Transport: Send + 'static {
    /// Receive the next frame, returning [`Inbound::Idle`] after a short wait.
    fn recv(&mut self) -> Result<Inbound, TransportError>;

    fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    fn send_ping(&mut self) -> Result<(), TransportError>;

    /// Best-effort close; errors are ignored.
    fn close(&mut self);
}

/// Prepare an accepted WebSocket for the hub's polling reads.
pub fn prepare(ws: &WebSocket<TcpStream>) -> std::io::Result<()> {
    ws.get_ref().set_read_timeout(Some(READ_POLL))
}

impl Transport for WebSocket<TcpStream> {
    fn recv(&mut self) -> Result<Inbound, TransportError> {
        match self.read() {
            Ok(WsMessage::Text(text)) => Ok(Inbound::Text(text.as_str().to_owned())),
            Ok(WsMessage::Close(_)) => Ok(Inbound::Closed),
            // Binary frames are ignored; ping replies are queued by tungstenite
            Ok(_) => Ok(Inbound::Idle),
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(Inbound::Idle)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(Inbound::Closed)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        WebSocket::send(self, WsMessage::Text(text.to_owned().into()))?;
        Ok(())
    }

    fn send_ping(&mut self) -> Result<(), TransportError> {
        WebSocket::send(self, WsMessage::Ping(Default::default()))?;
        Ok(())
    }

    fn close(&mut self) {
        let _ = WebSocket::close(self, None);
        let _ = WebSocket::flush(self);
    }
}
