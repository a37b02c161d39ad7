//! Session expiry notices.
//!
//! Every interval the sweep asks the session store for sessions expiring
//! within the threshold and sends `sessionAboutToExpire` to their
//! connections, once per session and expiry. A session that is extended
//! and later approaches its new expiry is warned again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lb_core::event::short_id;
use lb_session::{SessionStore, StoreHealth};
use parking_lot::Mutex;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::registry::ConnectionRegistry;
use crate::wire::{EventType, WireEvent};

/// Periodic expiry notifier.
pub struct ExpirySweep {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<dyn SessionStore>,
    health: Arc<StoreHealth>,
    threshold: Duration,
    interval: Duration,
    notified: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ExpirySweep {
    /// Creates a sweep warning `threshold` ahead of expiry, checking every
    /// `interval`.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sessions: Arc<dyn SessionStore>,
        threshold: Duration,
        interval: Duration,
    ) -> Arc<Self> {
        let health = registry.health().clone();
        Arc::new(Self {
            registry,
            sessions,
            health,
            threshold,
            interval,
            notified: Mutex::new(HashMap::new()),
        })
    }

    /// Starts the sweep loop.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(
                threshold_secs = this.threshold.as_secs(),
                interval_secs = this.interval.as_secs(),
                "session expiry sweep started"
            );
            loop {
                tokio::time::sleep(this.interval).await;
                if !this.sweep_once().await {
                    this.health.wait_available().await;
                }
            }
        })
    }

    /// Runs one pass. Returns `false` if the session store was unreachable.
    pub async fn sweep_once(&self) -> bool {
        let expiring = match self.sessions.expiring_within(self.threshold).await {
            Ok(expiring) => expiring,
            Err(err) => {
                if err.is_unavailable() {
                    tracing::warn!(error = %err, "expiry sweep paused");
                    self.health.mark_unavailable();
                    return false;
                }
                tracing::error!(error = %err, "expiry sweep failed");
                return true;
            }
        };

        let now = Utc::now();
        let mut notified = self.notified.lock();
        notified.retain(|id, _| expiring.iter().any(|s| &s.id == id));

        for session in expiring {
            if notified.get(&session.id) == Some(&session.expires_at) {
                continue;
            }
            let event = WireEvent::new(
                EventType::SessionAboutToExpire,
                json!({ "expiresIn": session.seconds_remaining(now) }),
            );
            let reached = self.registry.deliver_to_session(&session.id, &event);
            if reached > 0 {
                tracing::debug!(session = %short_id(&session.id), reached, "expiry notice sent");
                notified.insert(session.id, session.expires_at);
            }
        }
        true
    }
}
