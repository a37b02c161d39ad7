//! Session store trait.

use std::time::Duration;

use async_trait::async_trait;
use lb_model::SessionRecord;

use crate::error::SessionResult;

/// Backend for server-side sessions.
///
/// Expired sessions behave exactly like missing ones. Implementations must
/// be thread-safe and support concurrent access.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates an anonymous session with a fresh random id.
    async fn create(&self, ttl: Duration) -> SessionResult<SessionRecord>;

    /// Gets a live session.
    async fn get(&self, id: &str) -> SessionResult<Option<SessionRecord>>;

    /// Returns whether a live session exists.
    async fn exists(&self, id: &str) -> SessionResult<bool> {
        Ok(self.get(id).await?.is_some())
    }

    /// Binds an account to the session, or clears the binding with `None`.
    ///
    /// ## Errors
    ///
    /// Returns `SessionError::NotFound` if the session is gone.
    async fn bind_account(&self, id: &str, account_id: Option<&str>) -> SessionResult<()>;

    /// Stores the referrer unless one is already recorded. Returns whether
    /// the value was written.
    async fn set_referrer(&self, id: &str, referrer: &str) -> SessionResult<bool>;

    /// Extends the session's expiry to `ttl` from now.
    async fn touch(&self, id: &str, ttl: Duration) -> SessionResult<()>;

    /// Deletes a session. Missing sessions are ignored.
    async fn destroy(&self, id: &str) -> SessionResult<()>;

    /// Moves the data of `old_id` to a fresh id and destroys `old_id`.
    /// A missing `old_id` yields a fresh anonymous session.
    async fn rotate(&self, old_id: &str, ttl: Duration) -> SessionResult<SessionRecord>;

    /// Lists the live sessions bound to an account.
    async fn list_by_account(&self, account_id: &str) -> SessionResult<Vec<SessionRecord>>;

    /// Destroys every session bound to an account, returning their ids.
    async fn destroy_by_account(&self, account_id: &str) -> SessionResult<Vec<String>>;

    /// Lists live sessions expiring within `window` from now.
    async fn expiring_within(&self, window: Duration) -> SessionResult<Vec<SessionRecord>>;

    /// Checks connectivity.
    async fn ping(&self) -> SessionResult<()>;
}

/// Longest TTL a session may be given.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Converts a TTL into a chrono duration, capped at [`MAX_TTL`].
#[must_use]
pub fn chrono_ttl(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl.min(MAX_TTL)).unwrap_or_else(|_| chrono::Duration::days(3650))
}
