//! Login completion, logout and account deletion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lb_core::event::{Event, EventBuilder, EventLogger, EventType, TracingEventLogger, short_id};
use lb_core::{Error, Result};
use lb_events::ConnectionRegistry;
use lb_identity::{Outcome, Reconciled, ReconciliationEngine};
use lb_model::{Account, Application, NormalizedProfile, SessionRecord};
use lb_session::SessionStore;
use lb_storage::{AccountProvider, UsageProvider};
use lb_token::IssuedToken;

use crate::view::LoginResult;

/// Session/account coordinator.
pub struct Coordinator {
    pub(crate) engine: ReconciliationEngine,
    pub(crate) accounts: Arc<dyn AccountProvider>,
    pub(crate) usage: Arc<dyn UsageProvider>,
    pub(crate) sessions: Arc<dyn SessionStore>,
    pub(crate) registry: Arc<ConnectionRegistry>,
    pub(crate) audit: Arc<dyn EventLogger>,
    pub(crate) base_url: String,
    pub(crate) session_ttl: Duration,
    pub(crate) applications: Vec<Application>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("base_url", &self.base_url)
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Creates a coordinator. Audit events go to tracing until
    /// [`Coordinator::with_audit`] is called.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountProvider>,
        usage: Arc<dyn UsageProvider>,
        sessions: Arc<dyn SessionStore>,
        registry: Arc<ConnectionRegistry>,
        base_url: impl Into<String>,
        session_ttl: Duration,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            engine: ReconciliationEngine::new(accounts.clone(), base_url.clone()),
            accounts,
            usage,
            sessions,
            registry,
            audit: Arc::new(TracingEventLogger::new()),
            base_url,
            session_ttl,
            applications: Vec::new(),
        }
    }

    /// Sends audit events to `audit`.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn EventLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Sets the applications used to label sessions.
    #[must_use]
    pub fn with_applications(mut self, applications: Vec<Application>) -> Self {
        self.applications = applications;
        self
    }

    /// Returns the connection registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns the rolling session lifetime.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Returns the live session `id`, extending its expiry, or creates a
    /// new anonymous session. `referrer` is recorded once per session.
    pub async fn session(&self, id: Option<&str>, referrer: Option<&str>) -> Result<SessionRecord> {
        let existing = match id {
            Some(id) => self.sessions.get(id).await?,
            None => None,
        };
        let mut session = match existing {
            Some(session) => {
                self.sessions.touch(&session.id, self.session_ttl).await?;
                session
            }
            None => self.sessions.create(self.session_ttl).await?,
        };

        if let Some(referrer) = referrer {
            if session.referrer.is_none()
                && self.sessions.set_referrer(&session.id, referrer).await?
            {
                session.referrer = Some(referrer.to_string());
            }
        }
        Ok(session)
    }

    /// Returns the account bound to a session, if any.
    pub async fn current_account(&self, session_id: &str) -> Result<Option<Account>> {
        let Some(session) = self.sessions.get(session_id).await? else {
            return Ok(None);
        };
        match session.account_id {
            Some(account_id) => Ok(self.accounts.get(&account_id).await?),
            None => Ok(None),
        }
    }

    /// Issues a token for the session's current state. A logged-in
    /// request counts as a use of the account.
    pub async fn issue_token(&self, session_id: Option<&str>) -> Result<IssuedToken> {
        let account = match session_id {
            Some(id) => self.current_account(id).await?,
            None => None,
        };
        if let Some(account) = &account {
            self.touch_usage(&account.id).await;
        }
        Ok(self
            .registry
            .codec()
            .issue(account.as_ref(), session_id)
            .await?)
    }

    /// Completes a successful provider login for the session.
    ///
    /// A merge conflict is returned as [`Error::MergeConflict`] and leaves
    /// both accounts untouched.
    pub async fn complete_login(
        &self,
        session_id: &str,
        profile: &NormalizedProfile,
    ) -> Result<LoginResult> {
        let caller = self.current_account(session_id).await?;

        let reconciled = match self.engine.reconcile(caller.as_ref(), profile).await {
            Ok(reconciled) => reconciled,
            Err(err) => {
                self.record(
                    Event::builder(EventType::LoginError)
                        .provider(&profile.provider_id)
                        .session(session_id)
                        .failure(err.to_string()),
                )
                .await;
                return Err(err);
            }
        };

        let Reconciled {
            account,
            outcome,
            absorbed_id,
        } = reconciled;

        let session_id = match &outcome {
            Outcome::Conflict { providers } => {
                self.record(
                    Event::builder(EventType::MergeConflict)
                        .account(&account.id)
                        .provider(&profile.provider_id)
                        .session(session_id)
                        .detail("providers", providers.join(","))
                        .failure("accounts share providers"),
                )
                .await;
                return Err(Error::merge_conflict(providers.iter().cloned()));
            }
            Outcome::Created | Outcome::LoggedIn => self.login(session_id, &account).await?,
            Outcome::Attached | Outcome::Merged => {
                if let Some(absorbed_id) = &absorbed_id {
                    self.adopt_sessions(absorbed_id, &account).await;
                }
                self.broadcast_update(&account).await;
                session_id.to_string()
            }
        };

        self.touch_usage(&account.id).await;

        let event_type = match outcome {
            Outcome::Created => EventType::AccountCreated,
            Outcome::LoggedIn => EventType::Login,
            Outcome::Attached => EventType::IdentityAttached,
            _ => EventType::AccountsMerged,
        };
        let mut event = Event::builder(event_type)
            .account(&account.id)
            .provider(&profile.provider_id)
            .session(&session_id);
        if let Some(absorbed_id) = &absorbed_id {
            event = event.detail("absorbed", absorbed_id.clone());
        }
        self.record(event).await;

        Ok(LoginResult {
            account,
            outcome,
            session_id,
        })
    }

    /// Ends the session and tells its connections.
    pub async fn logout(&self, session_id: &str) -> Result<()> {
        let account = self.current_account(session_id).await?;

        self.sessions.destroy(session_id).await?;
        self.registry.notify_logout(session_id, account.as_ref());

        let mut event = Event::builder(EventType::Logout).session(session_id);
        if let Some(account) = &account {
            event = event.account(&account.id);
        }
        self.record(event).await;
        Ok(())
    }

    /// Deletes the account, ends all its sessions and tells their
    /// connections.
    pub async fn delete_account(&self, account_id: &str, session_id: &str) -> Result<()> {
        let account = self.accounts.get(account_id).await?;
        self.accounts.delete(account_id).await?;
        if let Err(err) = self.usage.delete(account_id).await {
            tracing::warn!(account = %account_id, error = %err, "usage record not removed");
        }

        let mut ended = self.sessions.destroy_by_account(account_id).await?;
        if !ended.iter().any(|id| id == session_id) {
            self.sessions.destroy(session_id).await?;
            ended.push(session_id.to_string());
        }
        for id in &ended {
            self.registry.notify_logout(id, account.as_ref());
        }

        self.record(
            Event::builder(EventType::AccountDeleted)
                .account(account_id)
                .session(session_id)
                .detail("sessions", ended.len().to_string()),
        )
        .await;
        Ok(())
    }

    /// Rotates the session id, binds the account and announces the login.
    async fn login(&self, session_id: &str, account: &Account) -> Result<String> {
        let fresh = self.sessions.rotate(session_id, self.session_ttl).await?;
        self.sessions
            .bind_account(&fresh.id, Some(&account.id))
            .await?;

        self.registry.rebind(session_id, &fresh.id);
        self.registry.notify_login(&fresh.id, account);
        tracing::debug!(
            from = %short_id(session_id),
            to = %short_id(&fresh.id),
            account = %account.id,
            "session rotated on login"
        );
        Ok(fresh.id)
    }

    /// Moves the sessions of a merged-away account to the survivor.
    async fn adopt_sessions(&self, absorbed_id: &str, survivor: &Account) {
        let sessions = match self.sessions.list_by_account(absorbed_id).await {
            Ok(sessions) => sessions,
            Err(err) => {
                tracing::warn!(account = %absorbed_id, error = %err, "sessions of merged account not moved");
                return;
            }
        };
        for session in sessions {
            match self
                .sessions
                .bind_account(&session.id, Some(&survivor.id))
                .await
            {
                Ok(()) => self.registry.notify_login(&session.id, survivor),
                Err(err) => {
                    tracing::warn!(session = %short_id(&session.id), error = %err, "session not moved");
                }
            }
        }
        if let Err(err) = self.usage.delete(absorbed_id).await {
            tracing::warn!(account = %absorbed_id, error = %err, "usage record not removed");
        }
    }

    /// Sends `updated` to every session of the account. Best-effort.
    pub(crate) async fn broadcast_update(&self, account: &Account) {
        match self.sessions.list_by_account(&account.id).await {
            Ok(sessions) => {
                for session in sessions {
                    self.registry.notify_updated(&session.id, account);
                }
            }
            Err(err) => {
                tracing::warn!(account = %account.id, error = %err, "update not broadcast");
            }
        }
    }

    /// Records a use of the account. Failures are logged only.
    pub async fn touch_usage(&self, account_id: &str) {
        if let Err(err) = self.usage.touch(account_id, Utc::now()).await {
            tracing::warn!(account = %account_id, error = %err, "usage not recorded");
        }
    }

    pub(crate) async fn record(&self, event: EventBuilder) {
        self.audit.log(event.build()).await;
    }
}
