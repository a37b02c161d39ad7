//! In-memory session store.
//!
//! For production with multiple instances, use a distributed store (Redis).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lb_crypto::random::session_id;
use lb_model::SessionRecord;
use parking_lot::RwLock;

use crate::error::{SessionError, SessionResult};
use crate::store::{SessionStore, chrono_ttl};

/// In-memory session store with an outage switch.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    unavailable: AtomicBool,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while unavailable every call fails with
    /// `SessionError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Overwrites a session's expiry. Test helper for expiry paths.
    pub fn set_expires_at(&self, id: &str, expires_at: chrono::DateTime<Utc>) {
        if let Some(session) = self.sessions.write().get_mut(id) {
            session.expires_at = expires_at;
        }
    }

    fn check(&self) -> SessionResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SessionError::Unavailable(
                "in-memory session store switched off".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn live(&self, id: &str) -> Option<SessionRecord> {
        let now = Utc::now();
        self.sessions
            .read()
            .get(id)
            .filter(|session| !session.is_expired_at(now))
            .cloned()
    }

    fn update<F>(&self, id: &str, f: F) -> SessionResult<()>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        match sessions.get_mut(id) {
            Some(session) if !session.is_expired_at(now) => {
                f(session);
                Ok(())
            }
            _ => Err(SessionError::NotFound(lb_core::event::short_id(id))),
        }
    }

    fn purge_expired(&self) {
        let now = Utc::now();
        self.sessions
            .write()
            .retain(|_, session| !session.is_expired_at(now));
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, ttl: Duration) -> SessionResult<SessionRecord> {
        self.check()?;
        let session = SessionRecord::new(session_id(), chrono_ttl(ttl));
        self.sessions
            .write()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, id: &str) -> SessionResult<Option<SessionRecord>> {
        self.check()?;
        Ok(self.live(id))
    }

    async fn bind_account(&self, id: &str, account_id: Option<&str>) -> SessionResult<()> {
        self.check()?;
        self.update(id, |session| {
            session.account_id = account_id.map(str::to_string);
        })
    }

    async fn set_referrer(&self, id: &str, referrer: &str) -> SessionResult<bool> {
        self.check()?;
        let mut written = false;
        self.update(id, |session| {
            if session.referrer.is_none() {
                session.referrer = Some(referrer.to_string());
                written = true;
            }
        })?;
        Ok(written)
    }

    async fn touch(&self, id: &str, ttl: Duration) -> SessionResult<()> {
        self.check()?;
        self.update(id, |session| session.touch(chrono_ttl(ttl)))
    }

    async fn destroy(&self, id: &str) -> SessionResult<()> {
        self.check()?;
        self.sessions.write().remove(id);
        Ok(())
    }

    async fn rotate(&self, old_id: &str, ttl: Duration) -> SessionResult<SessionRecord> {
        self.check()?;
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let previous = sessions
            .remove(old_id)
            .filter(|session| !session.is_expired_at(now));

        let mut fresh = SessionRecord::new(session_id(), chrono_ttl(ttl));
        if let Some(previous) = previous {
            fresh.account_id = previous.account_id;
            fresh.referrer = previous.referrer;
            fresh.created_at = previous.created_at;
        }
        sessions.insert(fresh.id.clone(), fresh.clone());
        Ok(fresh)
    }

    async fn list_by_account(&self, account_id: &str) -> SessionResult<Vec<SessionRecord>> {
        self.check()?;
        self.purge_expired();
        let mut sessions: Vec<SessionRecord> = self
            .sessions
            .read()
            .values()
            .filter(|session| session.account_id.as_deref() == Some(account_id))
            .cloned()
            .collect();
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions)
    }

    async fn destroy_by_account(&self, account_id: &str) -> SessionResult<Vec<String>> {
        self.check()?;
        let mut sessions = self.sessions.write();
        let ids: Vec<String> = sessions
            .values()
            .filter(|session| session.account_id.as_deref() == Some(account_id))
            .map(|session| session.id.clone())
            .collect();
        for id in &ids {
            sessions.remove(id);
        }
        Ok(ids)
    }

    async fn expiring_within(&self, window: Duration) -> SessionResult<Vec<SessionRecord>> {
        self.check()?;
        self.purge_expired();
        let horizon = Utc::now() + chrono_ttl(window);
        Ok(self
            .sessions
            .read()
            .values()
            .filter(|session| session.expires_at <= horizon)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> SessionResult<()> {
        self.check()
    }
}
