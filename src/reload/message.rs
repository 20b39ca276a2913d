//! Live Reload Message Protocol
//!
//! Defines the JSON message format for WebSocket communication between
//! the preview server and browser clients.
//!
//! # Message Types
//!
//! - `connected`: sent once, right after the handshake
//! - `reload`: the deck changed; clients refetch the whole presentation
//! - `slide`: presenter moved to `slideIndex` (relayed from clients)
//! - `theme`: presenter switched theme (relayed from clients)
//!
//! Zero and empty fields are left out of the encoding.

use serde::{Deserialize, Serialize};

/// Live reload message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// Connection established
    Connected,

    /// Full refetch signal
    Reload,

    /// Current slide changed
    Slide {
        #[serde(
            rename = "slideIndex",
            default,
            skip_serializing_if = "is_zero"
        )]
        slide_index: usize,
    },

    /// Theme changed
    Theme {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        theme: String,
    },
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Message {
    pub fn slide(index: usize) -> Self {
        Self::Slide { slide_index: index }
    }

    pub fn theme(name: impl Into<String>) -> Self {
        Self::Theme { theme: name.into() }
    }

    /// Compact JSON encoding
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    /// Parse a client frame; `None` for anything unrecognised.
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }

    /// Whether clients may send this type for relaying.
    pub fn is_relayable(&self) -> bool {
        matches!(self, Self::Slide { .. } | Self::Theme { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Reload => "reload",
            Self::Slide { .. } => "slide",
            Self::Theme { .. } => "theme",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_encoding() {
        assert_eq!(Message::Connected.to_json(), r#"{"type":"connected"}"#);
        assert_eq!(Message::Reload.to_json(), r#"{"type":"reload"}"#);
        assert_eq!(
            Message::slide(5).to_json(),
            r#"{"type":"slide","slideIndex":5}"#
        );
        assert_eq!(
            Message::theme("noir").to_json(),
            r#"{"type":"theme","theme":"noir"}"#
        );
    }

    #[test]
    fn test_empty_fields_omitted() {
        assert_eq!(Message::slide(0).to_json(), r#"{"type":"slide"}"#);
        assert_eq!(Message::theme("").to_json(), r#"{"type":"theme"}"#);
    }

    #[test]
    fn test_parse_client_frames() {
        assert_eq!(
            Message::from_json(r#"{"type":"slide","slideIndex":3}"#),
            Some(Message::slide(3))
        );
        assert_eq!(
            Message::from_json(r#"{"type":"slide"}"#),
            Some(Message::slide(0))
        );
        assert_eq!(
            Message::from_json(r#"{"type":"theme","theme":"light"}"#),
            Some(Message::theme("light"))
        );
    }

    #[test]
    fn test_unknown_frames_rejected() {
        assert_eq!(Message::from_json(r#"{"type":"page","path":"/"}"#), None);
        assert_eq!(Message::from_json("not json"), None);
        assert_eq!(Message::from_json(r#"{"slideIndex":1}"#), None);
    }

    #[test]
    fn test_relayable() {
        assert!(Message::slide(1).is_relayable());
        assert!(Message::theme("x").is_relayable());
        assert!(!Message::Reload.is_relayable());
        assert!(!Message::Connected.is_relayable());
    }
}
