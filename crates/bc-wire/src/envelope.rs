// SPDX-License-Identifier: MIT

//! The generic frame every WebSocket message (agent or UI) is wrapped in:
//! `{type, payload}` (`spec.md` §4.2, §4.3).
//!
//! Agent RPC responses (e.g. the result of `fs:browse`) have a payload
//! shape that depends on the request that provoked them, so the registry
//! never fully types inbound frames: it reads the envelope, and if
//! `payload.request_id` correlates with a pending request it hands the
//! raw payload back to the caller untyped (`spec.md` §4.3 "Message
//! dispatch"). Only frames whose `request_id` does *not* correlate are
//! decoded into [`crate::agent::AgentEvent`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope shared by every frame, in both directions, on both the agent
/// and UI sockets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self { message_type: message_type.into(), payload }
    }

    /// `payload.request_id`, when the payload is an object carrying one
    /// (`spec.md` §4.3).
    pub fn request_id(&self) -> Option<&str> {
        self.payload.get("request_id").and_then(Value::as_str)
    }

    /// Return a copy of this frame with `request_id` merged into the
    /// payload object. Used when issuing a correlated RPC
    /// ([`crate::agent::ControllerOutbound`]).
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        if let Value::Object(ref mut map) = self.payload {
            map.insert("request_id".to_string(), Value::String(request_id.into()));
        }
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let frame =
            Frame::new("backup:start", serde_json::json!({"job_id": "abc"})).with_request_id("r-1");
        let text = frame.to_json().expect("encode");
        let back = Frame::from_json(&text).expect("decode");
        assert_eq!(back.message_type, "backup:start");
        assert_eq!(back.request_id(), Some("r-1"));
        assert_eq!(back.payload["job_id"], "abc");
    }

    #[test]
    fn request_id_absent_when_never_set() {
        let frame = Frame::new("agent:register", serde_json::json!({}));
        assert_eq!(frame.request_id(), None);
    }
}
