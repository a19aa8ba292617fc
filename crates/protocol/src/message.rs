use crate::{ElementDescriptor, ResolveFailure, ResolvedLocation};
use serde::{Deserialize, Serialize};

/// Messages accepted on the WebSocket transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    FindElement { data: ElementDescriptor },
    Ping,
}

/// Messages sent back to a connected page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    ConnectionEstablished { message: String },
    Pong { timestamp: u64 },
    ElementResolved { data: ResolvedLocation },
    ElementNotFound { data: ResolveFailure },
    Error { message: String, error: String },
}
