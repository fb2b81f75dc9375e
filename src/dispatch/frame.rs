//! Frame, event, and close-notification value types
//!
//! One frame carries one logical message with a destination path and a
//! payload; framing on the wire belongs to the transport.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// An inbound frame decoded from the wire
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InboundFrame {
    /// Destination path, resolved against the route table
    pub path: String,
    /// Raw payload, decoded into the handler's declared type downstream
    #[serde(default)]
    pub payload: Value,
}

/// An outbound frame queued for delivery to a session
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundFrame {
    /// Path the frame relates to
    pub path: String,
    pub payload: Value,
}

impl OutboundFrame {
    /// Create an outbound frame
    pub fn new(path: impl Into<String>, payload: Value) -> Self {
        Self {
            path: path.into(),
            payload,
        }
    }

    /// Application-level error frame sent back on the triggering session
    pub fn error(path: impl Into<String>, message: &str) -> Self {
        Self {
            path: path.into(),
            payload: json!({ "error": message }),
        }
    }
}

/// An application-level event offered to subscribed sessions
#[derive(Debug, Clone)]
pub struct AppEvent {
    /// Event type, matched against session subscriptions
    pub event_type: String,
    /// Event payload, exposed to selectors under the `payload` root
    pub payload: Value,
}

impl AppEvent {
    /// Create an application event
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
        }
    }

    /// Selector context for this event, merged with session-scoped fields
    pub(crate) fn selector_context(&self, session_id: &str, created_at: &str) -> Value {
        json!({
            "type": self.event_type,
            "payload": self.payload,
            "session": { "id": session_id, "created_at": created_at },
        })
    }
}

/// WebSocket-style close status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloseStatus {
    pub code: u16,
    pub reason: Option<String>,
}

impl CloseStatus {
    /// Normal closure (1000)
    pub fn normal() -> Self {
        Self {
            code: 1000,
            reason: None,
        }
    }

    /// Endpoint going away (1001)
    pub fn going_away() -> Self {
        Self {
            code: 1001,
            reason: None,
        }
    }

    /// Protocol error (1002)
    pub fn protocol_error(reason: impl Into<String>) -> Self {
        Self {
            code: 1002,
            reason: Some(reason.into()),
        }
    }

    /// Policy violation (1008), used for security failures
    pub fn policy_violation(reason: impl Into<String>) -> Self {
        Self {
            code: 1008,
            reason: Some(reason.into()),
        }
    }

    /// Internal server error (1011)
    pub fn server_error() -> Self {
        Self {
            code: 1011,
            reason: None,
        }
    }
}

/// Terminal, exactly-once signal of session termination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseNotification {
    pub session_id: String,
    pub status: CloseStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_frame_deserialize() {
        let json = r#"{"path": "/rooms/42", "payload": {"text": "hi"}}"#;
        let frame: InboundFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.path, "/rooms/42");
        assert_eq!(frame.payload["text"], "hi");
    }

    #[test]
    fn test_inbound_frame_payload_defaults_to_null() {
        let frame: InboundFrame = serde_json::from_str(r#"{"path": "/ping"}"#).unwrap();
        assert!(frame.payload.is_null());
    }

    #[test]
    fn test_outbound_frame_serialize() {
        let frame = OutboundFrame::new("/rooms/42", json!({"text": "hi"}));
        let encoded = serde_json::to_string(&frame).unwrap();
        assert!(encoded.contains("\"path\":\"/rooms/42\""));
        assert!(encoded.contains("\"text\":\"hi\""));
    }

    #[test]
    fn test_error_frame() {
        let frame = OutboundFrame::error("/rooms/42", "no such room");
        assert_eq!(frame.payload["error"], "no such room");
    }

    #[test]
    fn test_event_selector_context() {
        let event = AppEvent::new("chat", json!({"type": "CHAT", "room": "lobby"}));
        let context = event.selector_context("abc-123", "2024-01-01T00:00:00Z");

        assert_eq!(context["type"], "chat");
        assert_eq!(context["payload"]["room"], "lobby");
        assert_eq!(context["session"]["id"], "abc-123");
    }

    #[test]
    fn test_close_status_constructors() {
        assert_eq!(CloseStatus::normal().code, 1000);
        assert_eq!(CloseStatus::going_away().code, 1001);
        let status = CloseStatus::policy_violation("denied");
        assert_eq!(status.code, 1008);
        assert_eq!(status.reason.as_deref(), Some("denied"));
    }
}
