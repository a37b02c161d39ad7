//! Results returned to the HTTP layer.

use chrono::{DateTime, Utc};
use lb_identity::Outcome;
use lb_model::Account;
use serde::Serialize;

/// Result of a completed login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    /// The caller-facing account.
    pub account: Account,
    /// What reconciliation did.
    pub outcome: Outcome,
    /// Session id the client must use from now on. Differs from the
    /// presented id after a login, which rotates it.
    pub session_id: String,
}

/// One entry of the caller's session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session id.
    pub id: String,
    /// Whether this is the session of the request.
    pub current: bool,
    /// Application name for the referrer, else the referrer itself.
    pub name: Option<String>,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
    /// Live connections bound to the session.
    pub connections: usize,
}

/// Result of a public account lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    /// The account exists under this id.
    Found(Account),
    /// The account was merged away; this is the survivor's URI.
    Moved(String),
}
