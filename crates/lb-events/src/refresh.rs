//! Per-connection token refresh.
//!
//! The task holds only a weak registry reference and re-reads the
//! connection's session on every tick, so rebinds are picked up and a
//! dropped registry ends the task.

use std::sync::Weak;

use serde_json::json;

use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::wire::{EventType, WireEvent};

enum Tick {
    Sent,
    Paused,
    Stop,
}

pub(crate) async fn run(registry: Weak<ConnectionRegistry>, id: ConnectionId) {
    loop {
        loop {
            let Some(strong) = registry.upgrade() else {
                return;
            };
            match tick(&strong, id).await {
                Tick::Sent => break,
                Tick::Stop => {
                    tracing::debug!(connection = %id, "token refresh stopped");
                    return;
                }
                Tick::Paused => {
                    let health = strong.health().clone();
                    drop(strong);
                    health.wait_available().await;
                }
            }
        }

        let period = match registry.upgrade() {
            Some(strong) => strong.refresh_period(),
            None => return,
        };
        tokio::time::sleep(period).await;
    }
}

async fn tick(registry: &ConnectionRegistry, id: ConnectionId) -> Tick {
    let Some(session_id) = registry.session_of(id) else {
        return Tick::Stop;
    };

    let account = match registry.account_for_session(&session_id).await {
        Ok(Some(account)) => account,
        Ok(None) => return Tick::Stop,
        Err(err) if err.is_unavailable() => {
            tracing::warn!(connection = %id, error = %err, "token refresh paused");
            registry.health().mark_unavailable();
            return Tick::Paused;
        }
        Err(err) => {
            tracing::warn!(connection = %id, error = %err, "token refresh failed");
            return Tick::Stop;
        }
    };

    match registry
        .codec()
        .issue(Some(&account), Some(&session_id))
        .await
    {
        Ok(issued) => {
            registry.deliver(id, &WireEvent::new(EventType::Token, json!(issued)));
            Tick::Sent
        }
        Err(err) => {
            tracing::error!(connection = %id, error = %err, "token issuance failed");
            Tick::Stop
        }
    }
}
