//! Audit events.
//!
//! The coordinator records one event per reconciliation outcome and per
//! account-management operation. Events are structured records; where they
//! end up is decided by the [`EventLogger`] the process is wired with.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Existing account logged in.
    Login,
    /// Provider rejected the credentials.
    LoginError,
    /// New account created from a first-time identity.
    AccountCreated,
    /// Identity attached to the caller's account.
    IdentityAttached,
    /// Another account was absorbed into the caller's account.
    AccountsMerged,
    /// Merge refused because both accounts share providers.
    MergeConflict,
    /// Identity removed from an account.
    IdentityDisconnected,
    /// Account renamed.
    AccountUpdated,
    /// Session logged out.
    Logout,
    /// Account deleted by its owner.
    AccountDeleted,
    /// Session removed from the session list.
    SessionRemoved,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: EventType,
    /// Outcome of the event.
    pub outcome: EventOutcome,
    /// Account the event concerns.
    pub account_id: Option<String>,
    /// Provider involved, if any.
    pub provider_id: Option<String>,
    /// Shortened session id.
    pub session_id: Option<String>,
    /// Error message (for failure events).
    pub error: Option<String>,
    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    account_id: Option<String>,
    provider_id: Option<String>,
    session_id: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            account_id: None,
            provider_id: None,
            session_id: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to failure with an error message.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the account id.
    #[must_use]
    pub fn account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Sets the provider id.
    #[must_use]
    pub fn provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Sets the session id. Only a short prefix is kept.
    #[must_use]
    pub fn session(mut self, session_id: &str) -> Self {
        self.session_id = Some(short_id(session_id));
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            account_id: self.account_id,
            provider_id: self.provider_id,
            session_id: self.session_id,
            error: self.error,
            details: self.details,
        }
    }
}

/// Returns the first eight characters of an identifier for log output.
#[must_use]
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Destination for audit events.
#[async_trait]
pub trait EventLogger: Send + Sync {
    /// Records an event. Logging never fails the surrounding operation.
    async fn log(&self, event: Event);
}

/// Event logger that writes to the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventLogger;

impl TracingEventLogger {
    /// Creates a new tracing logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventLogger for TracingEventLogger {
    async fn log(&self, event: Event) {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.event_type,
            outcome = ?event.outcome,
            account_id = ?event.account_id,
            provider_id = ?event.provider_id,
            session_id = ?event.session_id,
            error = ?event.error,
            details = ?event.details,
            "audit_event"
        );
    }
}

/// In-memory event logger for tests.
#[derive(Debug, Default)]
pub struct InMemoryEventLogger {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventLogger {
    /// Creates a new in-memory logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all logged events.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Returns the types of all logged events in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<EventType> {
        self.events.read().iter().map(|e| e.event_type).collect()
    }
}

#[async_trait]
impl EventLogger for InMemoryEventLogger {
    async fn log(&self, event: Event) {
        self.events.write().push(event);
    }
}
