//! Messages received on a connection.

use std::sync::Arc;

use lb_core::error::AUTHENTICATION_FAILED_MESSAGE;
use lb_core::event::short_id;
use serde_json::Value;

use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::wire::{EventType, Inbound, WireEvent, parse_inbound};

/// Handles one inbound text frame.
///
/// `authenticate` verifies the token, decrypts its session claim and binds
/// only this connection to that session, then reports the session state.
/// Failures are answered with an `error` event and leave the connection
/// as it was.
pub async fn handle_inbound(registry: &Arc<ConnectionRegistry>, id: ConnectionId, text: &str) {
    let message = match parse_inbound(text) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(connection = %id, error = ?err, "rejected inbound message");
            registry.deliver(id, &WireEvent::error(err.message()));
            return;
        }
    };

    match message {
        Inbound::Ping => {
            registry.deliver(id, &WireEvent::new(EventType::Pong, Value::Null));
        }
        Inbound::Authenticate { token } => authenticate(registry, id, &token).await,
    }
}

async fn authenticate(registry: &Arc<ConnectionRegistry>, id: ConnectionId, token: &str) {
    let session_id = registry
        .codec()
        .verify(token)
        .and_then(|claims| registry.codec().session_id(&claims));

    let session_id = match session_id {
        Ok(Some(session_id)) => session_id,
        Ok(None) => {
            tracing::debug!(connection = %id, "token carries no session");
            registry.deliver(id, &WireEvent::error(AUTHENTICATION_FAILED_MESSAGE));
            return;
        }
        Err(err) => {
            tracing::debug!(connection = %id, error = %err, "token rejected");
            registry.deliver(id, &WireEvent::error(AUTHENTICATION_FAILED_MESSAGE));
            return;
        }
    };

    if !registry.attach_session(id, &session_id) {
        return;
    }
    tracing::debug!(connection = %id, session = %short_id(&session_id), "connection authenticated");
    registry.deliver(id, &WireEvent::new(EventType::Authenticated, Value::Null));
    registry.sync_connection(id).await;
}
