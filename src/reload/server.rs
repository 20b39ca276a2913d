//! WebSocket Server for Live Reload
//!
//! Accepts TCP connections, performs the WebSocket handshake and hands each
//! connection to the hub on its own thread.

use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use anyhow::Result;

use crate::actor::ws::HubHandle;
use crate::actor::ws::transport;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Accept poll interval while idle.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Start the WebSocket listener. Returns the port actually bound.
///
/// The acceptor thread runs until the hub is stopped.
pub fn start_ws_server(interface: IpAddr, base_port: u16, hub: HubHandle) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    std::thread::Builder::new()
        .name("lectern-ws-accept".into())
        .spawn(move || accept_loop(listener, hub))?;

    Ok(actual_port)
}

fn accept_loop(listener: TcpListener, hub: HubHandle) {
    loop {
        if hub.is_stopped() {
            crate::debug!("ws"; "listener stopped");
            return;
        }

        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("ws"; "client connected: {}", addr);
                let hub = hub.clone();
                let spawned = std::thread::Builder::new()
                    .name(format!("lectern-ws-{addr}"))
                    .spawn(move || serve_client(stream, hub));
                if let Err(e) = spawned {
                    crate::log!("ws"; "failed to spawn client thread: {}", e);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                crate::log!("ws"; "accept error: {}", e);
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

/// Handshake, then serve the connection until it ends.
fn serve_client(stream: TcpStream, hub: HubHandle) {
    // Blocking mode for the handshake and writes
    if let Err(e) = stream.set_nonblocking(false) {
        crate::debug!("ws"; "set_nonblocking failed: {}", e);
        return;
    }

    let ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            crate::log!("ws"; "handshake failed: {}", e);
            return;
        }
    };

    if let Err(e) = transport::prepare(&ws) {
        crate::log!("ws"; "failed to configure socket: {}", e);
        return;
    }

    hub.handle_connection(ws);
}

// =============================================================================
// Helpers
// =============================================================================

/// Try binding to port, retry with incremented port if in use
pub fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
