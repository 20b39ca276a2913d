//! `[serve]` section configuration.
//!
//! Contains live preview server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5277                 # HTTP port number
//! ws_port = 35729             # WebSocket port for live reload
//! watch = true                # Reload clients when the deck changes
//! debounce_ms = 100           # Quiet period before a change is reported
//! ```
//!
//! Use `interface = "0.0.0.0"` to present from another device on the LAN.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Live preview server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// WebSocket port for reload and slide sync messages.
    pub ws_port: u16,

    /// Enable file watcher for live reload.
    pub watch: bool,

    /// Debounce window for change notifications, in milliseconds.
    pub debounce_ms: u64,
}

impl ServeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5277,
            ws_port: 35729,
            watch: true,
            debounce_ms: 100,
        }
    }
}
