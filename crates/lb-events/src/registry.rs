//! Connection registry and session-scoped fanout.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lb_core::event::short_id;
use lb_model::Account;
use lb_session::{SessionStore, StoreHealth};
use lb_storage::AccountProvider;
use lb_token::TokenCodec;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::refresh;
use crate::transport::Transport;
use crate::wire::{EventType, WireEvent};

/// Process-unique connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Static payloads and timing for the registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Interval between pushed tokens.
    pub refresh_period: Duration,
    /// Payload of the `about` event.
    pub about: Value,
    /// Payload of the `providers` event, `{"providers": [...]}`.
    pub providers: Value,
}

impl RegistryConfig {
    /// Creates a configuration with empty payloads.
    #[must_use]
    pub fn new(refresh_period: Duration) -> Self {
        Self {
            refresh_period,
            about: json!({}),
            providers: json!({ "providers": [] }),
        }
    }

    /// Sets the `about` payload.
    #[must_use]
    pub fn with_about(mut self, about: Value) -> Self {
        self.about = about;
        self
    }

    /// Sets the public provider list sent in the `providers` event.
    #[must_use]
    pub fn with_providers(mut self, providers: Value) -> Self {
        self.providers = json!({ "providers": providers });
        self
    }
}

struct Connection {
    session_id: Option<String>,
    transport: Arc<dyn Transport>,
    refresher: Option<JoinHandle<()>>,
}

impl Connection {
    fn cancel_refresh(&mut self) {
        if let Some(handle) = self.refresher.take() {
            handle.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel_refresh();
    }
}

/// Live connections, each bound to at most one session id.
///
/// All mutations take the write lock, so a rebind is observed atomically
/// by concurrent deliveries.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
    codec: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountProvider>,
    health: Arc<StoreHealth>,
    config: RegistryConfig,
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.read().len())
            .field("refresh_period", &self.config.refresh_period)
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountProvider>,
        health: Arc<StoreHealth>,
        config: RegistryConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            codec,
            sessions,
            accounts,
            health,
            config,
        })
    }

    /// Allocates a connection id.
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the token codec.
    #[must_use]
    pub const fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Returns the store health monitor.
    #[must_use]
    pub const fn health(&self) -> &Arc<StoreHealth> {
        &self.health
    }

    pub(crate) const fn refresh_period(&self) -> Duration {
        self.config.refresh_period
    }

    /// Adds a connection and sends `open`, `about`, `providers`, and
    /// `authenticated` when `session_id` names a live session.
    pub async fn register(
        &self,
        id: ConnectionId,
        session_id: Option<String>,
        transport: Arc<dyn Transport>,
    ) {
        let live = match session_id.as_deref() {
            Some(sid) => self.session_is_live(sid).await,
            None => false,
        };

        self.connections.write().insert(
            id,
            Connection {
                session_id,
                transport,
                refresher: None,
            },
        );
        tracing::debug!(connection = %id, live, "connection registered");

        self.deliver(id, &WireEvent::new(EventType::Open, Value::Null));
        self.deliver(id, &WireEvent::new(EventType::About, self.config.about.clone()));
        self.deliver(
            id,
            &WireEvent::new(EventType::Providers, self.config.providers.clone()),
        );
        if live {
            self.deliver(id, &WireEvent::new(EventType::Authenticated, Value::Null));
        }
    }

    /// Sends `loggedIn` or `loggedOut` for the connection's current session
    /// and starts or stops its token refresh accordingly.
    pub async fn sync_connection(self: &Arc<Self>, id: ConnectionId) {
        let Some(session_id) = self.session_of(id) else {
            self.logout_connection(id, None);
            return;
        };
        match self.account_for_session(&session_id).await {
            Ok(Some(account)) => self.login_connection(id, &account),
            Ok(None) => self.logout_connection(id, None),
            Err(err) => {
                if err.is_unavailable() {
                    self.health.mark_unavailable();
                }
                tracing::warn!(connection = %id, error = %err, "could not resolve session state");
                self.deliver(id, &WireEvent::error(err.user_message()));
            }
        }
    }

    /// Repoints a single connection to `session_id`.
    ///
    /// Returns `false` if the connection is gone.
    pub fn attach_session(&self, id: ConnectionId, session_id: &str) -> bool {
        match self.connections.write().get_mut(&id) {
            Some(connection) => {
                connection.session_id = Some(session_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Sends `loggedIn` to every connection of the session and (re)starts
    /// their token refresh. The first token follows immediately.
    pub fn notify_login(self: &Arc<Self>, session_id: &str, account: &Account) {
        for id in self.connections_for(session_id) {
            self.login_connection(id, account);
        }
    }

    /// Sends `loggedOut` with the account that logged out to every
    /// connection of the session and stops their token refresh.
    pub fn notify_logout(&self, session_id: &str, account: Option<&Account>) {
        for id in self.connections_for(session_id) {
            self.logout_connection(id, account);
        }
    }

    /// Sends `updated` with the current account to the session's
    /// connections.
    pub fn notify_updated(&self, session_id: &str, account: &Account) -> usize {
        self.deliver_to_session(
            session_id,
            &WireEvent::new(EventType::Updated, json!({ "user": account })),
        )
    }

    /// Moves every connection bound to `old_id` over to `new_id`. Running
    /// token refreshers keep going and pick up the new id on their next
    /// tick.
    pub fn rebind(&self, old_id: &str, new_id: &str) -> usize {
        let mut connections = self.connections.write();
        let mut moved = 0;
        for connection in connections.values_mut() {
            if connection.session_id.as_deref() == Some(old_id) {
                connection.session_id = Some(new_id.to_string());
                moved += 1;
            }
        }
        if moved > 0 {
            tracing::debug!(
                from = %short_id(old_id),
                to = %short_id(new_id),
                moved,
                "connections rebound"
            );
        }
        moved
    }

    /// Removes a connection, cancelling its token refresh. Removing an
    /// unknown id is a no-op.
    pub fn remove(&self, id: ConnectionId) {
        let removed = self.connections.write().remove(&id);
        if removed.is_some() {
            tracing::debug!(connection = %id, "connection removed");
        }
    }

    /// Closes and removes every connection bound to the session.
    pub fn close_session(&self, session_id: &str) -> usize {
        let mut connections = self.connections.write();
        let ids: Vec<ConnectionId> = connections
            .iter()
            .filter(|(_, c)| c.session_id.as_deref() == Some(session_id))
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(connection) = connections.remove(id) {
                connection.transport.close();
            }
        }
        ids.len()
    }

    /// Sends an event to one connection. Returns `false` if the connection
    /// is unknown or the frame was dropped.
    pub fn deliver(&self, id: ConnectionId, event: &WireEvent) -> bool {
        let connections = self.connections.read();
        connections
            .get(&id)
            .is_some_and(|connection| connection.transport.send(event.to_json()))
    }

    /// Sends an event to every connection of the session. Returns the
    /// number of connections reached.
    pub fn deliver_to_session(&self, session_id: &str, event: &WireEvent) -> usize {
        let frame = event.to_json();
        let connections = self.connections.read();
        connections
            .values()
            .filter(|c| c.session_id.as_deref() == Some(session_id))
            .filter(|c| c.transport.send(frame.clone()))
            .count()
    }

    /// Returns the connections bound to the session.
    #[must_use]
    pub fn connections_for(&self, session_id: &str) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self
            .connections
            .read()
            .iter()
            .filter(|(_, c)| c.session_id.as_deref() == Some(session_id))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Returns the session a connection is bound to.
    #[must_use]
    pub fn session_of(&self, id: ConnectionId) -> Option<String> {
        self.connections
            .read()
            .get(&id)
            .and_then(|c| c.session_id.clone())
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns whether the connection has a running token refresher.
    #[must_use]
    pub fn is_refreshing(&self, id: ConnectionId) -> bool {
        self.connections
            .read()
            .get(&id)
            .and_then(|c| c.refresher.as_ref())
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Resolves the account bound to a session. `None` when the session is
    /// gone, anonymous, or points at a deleted account.
    pub(crate) async fn account_for_session(
        &self,
        session_id: &str,
    ) -> lb_core::Result<Option<Account>> {
        let Some(session) = self.sessions.get(session_id).await? else {
            return Ok(None);
        };
        let Some(account_id) = session.account_id else {
            return Ok(None);
        };
        Ok(self.accounts.get(&account_id).await?)
    }

    fn login_connection(self: &Arc<Self>, id: ConnectionId, account: &Account) {
        self.deliver(
            id,
            &WireEvent::new(EventType::LoggedIn, json!({ "user": account })),
        );

        let mut connections = self.connections.write();
        if let Some(connection) = connections.get_mut(&id) {
            connection.cancel_refresh();
            connection.refresher = Some(tokio::spawn(refresh::run(Arc::downgrade(self), id)));
        }
    }

    fn logout_connection(&self, id: ConnectionId, account: Option<&Account>) {
        if let Some(connection) = self.connections.write().get_mut(&id) {
            connection.cancel_refresh();
        }
        self.deliver(
            id,
            &WireEvent::new(EventType::LoggedOut, json!({ "user": account })),
        );
    }

    async fn session_is_live(&self, session_id: &str) -> bool {
        match self.sessions.exists(session_id).await {
            Ok(live) => live,
            Err(err) => {
                if err.is_unavailable() {
                    self.health.mark_unavailable();
                }
                tracing::warn!(session = %short_id(session_id), error = %err, "session lookup failed");
                false
            }
        }
    }
}
