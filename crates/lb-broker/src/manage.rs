//! Account management operations.

use lb_core::event::{Event, EventType, short_id};
use lb_core::{Error, Result};
use lb_model::application::label_for_referrer;
use lb_model::{Account, SessionRecord};

use crate::coordinator::Coordinator;
use crate::view::{SessionView, UserLookup};

impl Coordinator {
    /// Renames the account and pushes `updated` to its sessions.
    pub async fn rename(&self, account_id: &str, name: &str) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()));
        }
        let account = self.accounts.rename(account_id, name).await?;
        self.broadcast_update(&account).await;
        self.record(
            Event::builder(EventType::AccountUpdated)
                .account(account_id)
                .detail("field", "name"),
        )
        .await;
        Ok(account)
    }

    /// Removes one identity. The last identity of an account cannot be
    /// removed.
    pub async fn disconnect_identity(&self, account_id: &str, provider_id: &str) -> Result<Account> {
        let account = self.accounts.remove_identity(account_id, provider_id).await?;
        self.broadcast_update(&account).await;
        self.record(
            Event::builder(EventType::IdentityDisconnected)
                .account(account_id)
                .provider(provider_id),
        )
        .await;
        Ok(account)
    }

    /// Lists the account's sessions, newest expiry first.
    pub async fn list_sessions(&self, account_id: &str, current: &str) -> Result<Vec<SessionView>> {
        let mut sessions = self.sessions.list_by_account(account_id).await?;
        sessions.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));
        Ok(sessions
            .into_iter()
            .map(|session| self.view(session, current))
            .collect())
    }

    fn view(&self, session: SessionRecord, current: &str) -> SessionView {
        let connections = self.registry.connections_for(&session.id).len();
        SessionView {
            current: session.id == current,
            name: session
                .referrer
                .as_deref()
                .map(|referrer| label_for_referrer(&self.applications, referrer)),
            expires_at: session.expires_at,
            connections,
            id: session.id,
        }
    }

    /// Ends one of the account's sessions and closes its connections.
    pub async fn remove_session(&self, account_id: &str, target: &str) -> Result<()> {
        let owned = self
            .sessions
            .list_by_account(account_id)
            .await?
            .iter()
            .any(|session| session.id == target);
        if !owned {
            return Err(Error::Validation(
                "session does not belong to the account".to_string(),
            ));
        }
        self.end_session(account_id, target).await
    }

    /// Ends every session of the account except `current`. Returns how many
    /// were removed.
    pub async fn remove_other_sessions(&self, account_id: &str, current: &str) -> Result<usize> {
        let others: Vec<String> = self
            .sessions
            .list_by_account(account_id)
            .await?
            .into_iter()
            .map(|session| session.id)
            .filter(|id| id != current)
            .collect();
        for id in &others {
            self.end_session(account_id, id).await?;
        }
        Ok(others.len())
    }

    async fn end_session(&self, account_id: &str, session_id: &str) -> Result<()> {
        self.sessions.destroy(session_id).await?;
        let closed = self.registry.close_session(session_id);
        tracing::debug!(session = %short_id(session_id), closed, "session removed");
        self.record(
            Event::builder(EventType::SessionRemoved)
                .account(account_id)
                .session(session_id),
        )
        .await;
        Ok(())
    }

    /// Looks up an account by id, following merges.
    pub async fn lookup_user(&self, id: &str) -> Result<UserLookup> {
        if let Some(account) = self.accounts.get(id).await? {
            return Ok(UserLookup::Found(account));
        }
        let uri = Account::uri_for(&self.base_url, id);
        match self.accounts.find_by_merged_uri(&uri).await? {
            Some(survivor) => Ok(UserLookup::Moved(survivor.uri)),
            None => Err(Error::NotFound(format!("Account {id}"))),
        }
    }
}
