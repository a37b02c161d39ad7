//! Event wire format.
//!
//! Outbound events are `{"type": ..., "date": <ISO-8601>, "data": ...}`.
//! Inbound messages are `{"type": "authenticate", "token": ...}` or
//! `{"type": "ping"}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent when an inbound payload is not valid JSON.
pub const UNPARSABLE_MESSAGE: &str = "Message could not be parsed.";

/// Outbound event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    /// Connection registered.
    Open,
    /// Server metadata.
    About,
    /// Public provider catalog.
    Providers,
    /// The connection's session exists.
    Authenticated,
    /// The session is bound to an account.
    LoggedIn,
    /// The session is anonymous.
    LoggedOut,
    /// The account changed.
    Updated,
    /// A fresh token.
    Token,
    /// A request on the connection failed.
    Error,
    /// The session expires soon.
    SessionAboutToExpire,
    /// Answer to `ping`.
    Pong,
}

/// An outbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Creation time.
    pub date: DateTime<Utc>,
    /// Payload, `null` when the event has none.
    pub data: Value,
}

impl WireEvent {
    /// Creates an event stamped now.
    #[must_use]
    pub fn new(event_type: EventType, data: Value) -> Self {
        Self {
            event_type,
            date: Utc::now(),
            data,
        }
    }

    /// Creates an `error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(
            EventType::Error,
            serde_json::json!({ "message": message.into() }),
        )
    }

    /// Serializes to the JSON text frame.
    #[must_use]
    pub fn to_json(&self) -> String {
        // Serializing a struct of a unit enum, a timestamp and a Value
        // cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Bind the connection to the session carried by a token.
    Authenticate {
        /// Token previously issued by this service.
        token: String,
    },
    /// Liveness check.
    Ping,
}

/// Reasons an inbound message is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundError {
    /// Not JSON, or missing required fields.
    Unparsable,
    /// A `type` this server does not handle.
    UnknownType(String),
}

impl InboundError {
    /// Returns the message sent back in the `error` event.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Unparsable => UNPARSABLE_MESSAGE.to_string(),
            Self::UnknownType(kind) => format!("Unknown request type {kind}."),
        }
    }
}

#[derive(Deserialize)]
struct RawInbound {
    #[serde(rename = "type")]
    kind: Option<Value>,
    token: Option<String>,
}

/// Parses an inbound text frame.
pub fn parse_inbound(text: &str) -> Result<Inbound, InboundError> {
    let raw: RawInbound = serde_json::from_str(text).map_err(|_| InboundError::Unparsable)?;
    let kind = match raw.kind {
        Some(Value::String(kind)) => kind,
        Some(other) => return Err(InboundError::UnknownType(other.to_string())),
        None => return Err(InboundError::UnknownType("undefined".to_string())),
    };

    match kind.as_str() {
        "authenticate" => raw
            .token
            .map(|token| Inbound::Authenticate { token })
            .ok_or(InboundError::Unparsable),
        "ping" => Ok(Inbound::Ping),
        _ => Err(InboundError::UnknownType(kind)),
    }
}
