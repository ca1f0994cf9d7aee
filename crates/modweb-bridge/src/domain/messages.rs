//! JSON message types for the viewer-facing WebSocket protocol.
//!
//! The session pushes exactly two kinds of message, both JSON objects with a
//! `"type"` discriminant field (serde's `#[serde(tag = "type")]`):
//!
//! ```json
//! {"type":"serverInfo","content":"Server: localhost:5020"}
//! {"type":"modbusData","content":"100:10, 101:20","timestamp":"2026-08-29T12:00:00Z"}
//! {"type":"modbusData","content":"Error: device read timed out","timestamp":"…"}
//! ```
//!
//! `content` is deliberately free-form text, not structured data: the viewer
//! renders it verbatim, so register formatting and error descriptions can
//! evolve without a protocol change.  Device read failures reuse the
//! `modbusData` envelope so the viewer's data pane shows them in-line.
//!
//! The protocol defines no inbound application messages; anything the viewer
//! sends is only used to detect liveness.

use serde::{Deserialize, Serialize};

/// One outbound message to the viewer.
///
/// `ServerInfo` is sent exactly once, immediately after the WebSocket
/// upgrade.  `ModbusData` is sent once per polling tick (carrying either
/// formatted register values or an error description) and is the only
/// variant with a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ViewerMessage {
    /// Session handshake: identifies the polled device endpoint.
    #[serde(rename = "serverInfo")]
    ServerInfo {
        /// `"Server: <host>:<port>"` for the device this session polls.
        content: String,
    },

    /// One tick's reading (or read-failure description).
    #[serde(rename = "modbusData")]
    ModbusData {
        /// Formatted `"<addr>:<value>"` pairs, or `"Error: <detail>"`.
        content: String,
        /// RFC3339 timestamp of the tick that produced this message.
        timestamp: String,
    },
}

impl ViewerMessage {
    /// Builds the handshake message for a device endpoint (`host:port`).
    pub fn server_info(endpoint: &str) -> Self {
        Self::ServerInfo {
            content: format!("Server: {endpoint}"),
        }
    }

    /// Builds a data message from already-formatted register content.
    pub fn data(content: String, timestamp: String) -> Self {
        Self::ModbusData { content, timestamp }
    }

    /// Builds an error-carrying data message embedding the failure text.
    pub fn read_error(error: &impl std::fmt::Display, timestamp: String) -> Self {
        Self::ModbusData {
            content: format!("Error: {error}"),
            timestamp,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_json_shape() {
        let msg = ViewerMessage::server_info("localhost:5020");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "serverInfo");
        assert_eq!(json["content"], "Server: localhost:5020");
        // The handshake message carries no timestamp field at all.
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_data_message_json_shape() {
        let msg = ViewerMessage::data(
            "4000:1234".to_string(),
            "2026-08-29T12:00:00Z".to_string(),
        );
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "modbusData");
        assert_eq!(json["content"], "4000:1234");
        assert_eq!(json["timestamp"], "2026-08-29T12:00:00Z");
    }

    #[test]
    fn test_read_error_embeds_error_text() {
        let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "mock error");
        let msg = ViewerMessage::read_error(&err, "2026-08-29T12:00:00Z".to_string());

        match msg {
            ViewerMessage::ModbusData { content, .. } => {
                assert!(content.starts_with("Error: "));
                assert!(content.contains("mock error"));
            }
            other => panic!("expected ModbusData, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_through_json() {
        let msg = ViewerMessage::data("0:1, 1:2".to_string(), "ts".to_string());
        let json = serde_json::to_string(&msg).unwrap();
        let back: ViewerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
