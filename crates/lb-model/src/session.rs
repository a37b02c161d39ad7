//! Session records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Server-side session data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Opaque session identifier handed to the client.
    pub id: String,
    /// Authenticated account, absent for anonymous sessions.
    #[serde(default)]
    pub account_id: Option<String>,
    /// First external URL seen for this session.
    #[serde(default)]
    pub referrer: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Rolling expiry.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Creates an anonymous session expiring after `ttl`.
    #[must_use]
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            account_id: None,
            referrer: None,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Returns whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Returns whether the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns whether an account is bound.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.account_id.is_some()
    }

    /// Returns the whole seconds left before expiry, zero if expired.
    #[must_use]
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.expires_at - now).num_seconds()).unwrap_or(0)
    }

    /// Extends the expiry to `ttl` from now.
    pub fn touch(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + ttl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_anonymous_and_live() {
        let session = SessionRecord::new("s1", Duration::minutes(5));
        assert!(!session.is_authenticated());
        assert!(!session.is_expired());
        assert!(session.seconds_remaining(Utc::now()) > 290);
    }

    #[test]
    fn expired_session_has_no_time_left() {
        let session = SessionRecord::new("s1", Duration::seconds(-1));
        assert!(session.is_expired());
        assert_eq!(session.seconds_remaining(Utc::now()), 0);
    }
}
