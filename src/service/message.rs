//! Messages delivered to chat viewers

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::round::RoundPayload;

/// Sender name used for private replies from the service itself
pub const SERVER_SENDER: &str = "Server";

/// A chat line, either from a player or from the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Display name of the author
    pub sender_name: String,
    /// Message body, as submitted
    pub text: String,
    /// Unix time in milliseconds
    pub timestamp: u64,
}

impl ChatMessage {
    /// Create a message stamped with the current time
    pub fn new(sender_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender_name: sender_name.into(),
            text: text.into(),
            timestamp: unix_millis(),
        }
    }

    /// Create a message from the service
    pub fn server(text: impl Into<String>) -> Self {
        Self::new(SERVER_SENDER, text)
    }
}

/// Everything a chat viewer can receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ChatEvent {
    /// A chat line
    Message(ChatMessage),
    /// The room's round changed
    Round(RoundPayload),
}

impl ChatEvent {
    /// The chat line, if this is one
    pub fn as_message(&self) -> Option<&ChatMessage> {
        match self {
            ChatEvent::Message(message) => Some(message),
            ChatEvent::Round(_) => None,
        }
    }
}

impl From<RoundPayload> for ChatEvent {
    fn from(payload: RoundPayload) -> Self {
        ChatEvent::Round(payload)
    }
}

impl From<ChatMessage> for ChatEvent {
    fn from(message: ChatMessage) -> Self {
        ChatEvent::Message(message)
    }
}

/// Response to a submitted guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessReply {
    /// Whether the text matched one of the round's keywords
    pub matched: bool,
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message() {
        let message = ChatMessage::server("Welcome alice");

        assert_eq!(message.sender_name, "Server");
        assert!(message.timestamp > 0);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = ChatEvent::Message(ChatMessage {
            sender_name: "alice".into(),
            text: "hello".into(),
            timestamp: 1_700_000_000_000,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["data"]["senderName"], "alice");
        assert_eq!(json["data"]["timestamp"], 1_700_000_000_000u64);

        let round = ChatEvent::from(RoundPayload {
            content_url: "u1".into(),
            keywords: vec!["cat".into()],
        });
        let json = serde_json::to_value(&round).unwrap();
        assert_eq!(json["type"], "round");
        assert_eq!(json["data"]["contentUrl"], "u1");
    }
}
