//! Wire types of the time-travel monitor protocol.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Message type the adapter acts on. Everything else is ignored.
pub const DISPATCH: &str = "DISPATCH";

/// Inbound message from the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorMessage {
    #[serde(rename = "type")]
    pub kind: String,
    /// JSON map of store name to state snapshot.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

impl MonitorMessage {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn dispatch(kind: PayloadKind, state: Option<String>) -> Self {
        Self {
            kind: DISPATCH.to_string(),
            state,
            payload: Some(MessagePayload {
                kind,
                status: None,
                action_id: None,
            }),
        }
    }

    pub fn is_dispatch(&self) -> bool {
        self.kind == DISPATCH
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(rename = "type")]
    pub kind: PayloadKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(default, rename = "actionId", skip_serializing_if = "Option::is_none")]
    pub action_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadKind {
    Commit,
    PauseRecording,
    JumpToState,
    JumpToAction,
    ToggleAction,
    #[serde(other)]
    Unknown,
}

impl PayloadKind {
    /// Whether the message must carry a state to be acted on.
    pub fn needs_state(self) -> bool {
        matches!(
            self,
            PayloadKind::JumpToState | PayloadKind::JumpToAction | PayloadKind::ToggleAction
        )
    }
}

/// Options handed to [`MonitorConnector::connect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    pub name: String,
}

pub type MonitorListener = Arc<dyn Fn(&MonitorMessage) + Send + Sync>;

/// Connection to a time-travel monitor.
pub trait Monitor: Send + Sync {
    /// Reset the monitor's baseline.
    fn init(&self, state: &serde_json::Value);

    fn send(&self, label: &str, state: &serde_json::Value);

    fn error(&self, message: &str);

    /// Register the receiver of inbound messages.
    fn subscribe(&self, listener: MonitorListener);
}

/// Opens monitor connections.
pub trait MonitorConnector {
    fn connect(&self, options: &ConnectOptions) -> Result<Arc<dyn Monitor>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jump() {
        let raw = r#"{"type":"DISPATCH","state":"{\"todos\":{}}","payload":{"type":"JUMP_TO_ACTION","actionId":3}}"#;
        let message = MonitorMessage::parse(raw).unwrap();
        assert!(message.is_dispatch());
        let payload = message.payload.unwrap();
        assert_eq!(payload.kind, PayloadKind::JumpToAction);
        assert_eq!(payload.action_id, Some(3));
        assert_eq!(message.state.as_deref(), Some(r#"{"todos":{}}"#));
    }

    #[test]
    fn test_parse_pause_and_unknown() {
        let message =
            MonitorMessage::parse(r#"{"type":"DISPATCH","payload":{"type":"PAUSE_RECORDING","status":true}}"#)
                .unwrap();
        let payload = message.payload.unwrap();
        assert_eq!(payload.kind, PayloadKind::PauseRecording);
        assert_eq!(payload.status, Some(true));
        assert!(message.state.is_none());

        let message =
            MonitorMessage::parse(r#"{"type":"DISPATCH","state":null,"payload":{"type":"IMPORT_STATE"}}"#).unwrap();
        assert_eq!(message.payload.unwrap().kind, PayloadKind::Unknown);

        let message = MonitorMessage::parse(r#"{"type":"START"}"#).unwrap();
        assert!(!message.is_dispatch());
    }

    #[test]
    fn test_malformed_message() {
        assert!(MonitorMessage::parse("{not json").is_err());
    }
}
