//! Redis session store implementation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fred::cmd;
use fred::prelude::*;
use fred::types::ExpireOptions;
use lb_core::event::short_id;
use lb_crypto::random::session_id;
use lb_model::SessionRecord;
use lb_session::store::chrono_ttl;
use lb_session::{SessionError, SessionResult, SessionStore};

use crate::config::RedisConfig;
use crate::error::{from_redis_error, from_serde_error};

const EXPIRY_INDEX: &str = "session-expiry";

/// Redis-based session store.
pub struct RedisSessionStore {
    client: Client,
    config: RedisConfig,
}

#[allow(clippy::cast_precision_loss)]
fn score(at: DateTime<Utc>) -> f64 {
    at.timestamp() as f64
}

/// Seconds from now until `expires_at`, at least one.
fn expiry_seconds(expires_at: DateTime<Utc>) -> i64 {
    (expires_at - Utc::now()).num_seconds().max(1)
}

impl RedisSessionStore {
    /// Connects to Redis.
    ///
    /// ## Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(config: RedisConfig) -> SessionResult<Self> {
        let redis_config = Config::from_url(&config.url)
            .map_err(|e| SessionError::Internal(format!("invalid redis url: {e}")))?;

        let performance = PerformanceConfig {
            default_command_timeout: config.command_timeout,
            ..Default::default()
        };
        let delay = u32::try_from(config.reconnect_delay.as_millis()).unwrap_or(u32::MAX);
        let client = Client::new(
            redis_config,
            Some(performance),
            None,
            Some(ReconnectPolicy::new_constant(0, delay)),
        );

        client.init().await.map_err(from_redis_error)?;
        tracing::info!(prefix = %config.key_prefix, "connected to redis session store");

        Ok(Self { client, config })
    }

    /// Returns the underlying Redis client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    fn session_key(&self, id: &str) -> String {
        self.config.prefixed_key(&format!("session:{id}"))
    }

    fn account_key(&self, account_id: &str) -> String {
        self.config
            .prefixed_key(&format!("account-sessions:{account_id}"))
    }

    fn expiry_key(&self) -> String {
        self.config.prefixed_key(EXPIRY_INDEX)
    }

    async fn load(&self, id: &str) -> SessionResult<Option<SessionRecord>> {
        let value: Option<String> = self
            .client
            .get(self.session_key(id))
            .await
            .map_err(from_redis_error)?;

        match value {
            Some(raw) => {
                let session: SessionRecord = serde_json::from_str(&raw).map_err(from_serde_error)?;
                Ok(Some(session).filter(|s| !s.is_expired()))
            }
            None => Ok(None),
        }
    }

    async fn load_existing(&self, id: &str) -> SessionResult<SessionRecord> {
        self.load(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(short_id(id)))
    }

    async fn save(&self, session: &SessionRecord) -> SessionResult<()> {
        let serialized = serde_json::to_string(session).map_err(from_serde_error)?;
        self.client
            .set::<(), _, _>(
                self.session_key(&session.id),
                serialized,
                Some(Expiration::EX(expiry_seconds(session.expires_at))),
                None,
                false,
            )
            .await
            .map_err(from_redis_error)?;
        self.client
            .zadd::<(), _, _>(
                self.expiry_key(),
                None,
                None,
                false,
                false,
                (score(session.expires_at), session.id.clone()),
            )
            .await
            .map_err(from_redis_error)?;
        if let Some(account_id) = &session.account_id {
            let key = self.account_key(account_id);
            self.client
                .sadd::<(), _, _>(&key, session.id.clone())
                .await
                .map_err(from_redis_error)?;
            self.extend_index(&key, session.expires_at).await?;
        }
        Ok(())
    }

    /// Keeps an account's session set alive as long as its longest-lived
    /// member. `NX` covers a fresh set, `GT` only ever pushes the deadline out.
    async fn extend_index(&self, key: &str, expires_at: DateTime<Utc>) -> SessionResult<()> {
        let seconds = expiry_seconds(expires_at);
        for option in [ExpireOptions::NX, ExpireOptions::GT] {
            self.client
                .expire::<(), _>(key, seconds, Some(option))
                .await
                .map_err(from_redis_error)?;
        }
        Ok(())
    }

    async fn remove(&self, id: &str, account_id: Option<&str>) -> SessionResult<()> {
        self.client
            .del::<(), _>(self.session_key(id))
            .await
            .map_err(from_redis_error)?;
        self.client
            .zrem::<(), _, _>(self.expiry_key(), id.to_string())
            .await
            .map_err(from_redis_error)?;
        if let Some(account_id) = account_id {
            self.client
                .srem::<(), _, _>(self.account_key(account_id), id.to_string())
                .await
                .map_err(from_redis_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, ttl: Duration) -> SessionResult<SessionRecord> {
        let session = SessionRecord::new(session_id(), chrono_ttl(ttl));
        self.save(&session).await?;
        Ok(session)
    }

    async fn get(&self, id: &str) -> SessionResult<Option<SessionRecord>> {
        self.load(id).await
    }

    async fn exists(&self, id: &str) -> SessionResult<bool> {
        let count: i64 = self
            .client
            .exists(self.session_key(id))
            .await
            .map_err(from_redis_error)?;
        Ok(count > 0)
    }

    async fn bind_account(&self, id: &str, account_id: Option<&str>) -> SessionResult<()> {
        let mut session = self.load_existing(id).await?;
        if let Some(previous) = session.account_id.as_deref() {
            if Some(previous) != account_id {
                self.client
                    .srem::<(), _, _>(self.account_key(previous), id.to_string())
                    .await
                    .map_err(from_redis_error)?;
            }
        }
        session.account_id = account_id.map(str::to_string);
        self.save(&session).await
    }

    async fn set_referrer(&self, id: &str, referrer: &str) -> SessionResult<bool> {
        let mut session = self.load_existing(id).await?;
        if session.referrer.is_some() {
            return Ok(false);
        }
        session.referrer = Some(referrer.to_string());
        self.save(&session).await?;
        Ok(true)
    }

    async fn touch(&self, id: &str, ttl: Duration) -> SessionResult<()> {
        let mut session = self.load_existing(id).await?;
        session.touch(chrono_ttl(ttl));
        self.save(&session).await
    }

    async fn destroy(&self, id: &str) -> SessionResult<()> {
        let account_id = self.load(id).await?.and_then(|s| s.account_id);
        self.remove(id, account_id.as_deref()).await
    }

    async fn rotate(&self, old_id: &str, ttl: Duration) -> SessionResult<SessionRecord> {
        let previous = self.load(old_id).await?;
        let mut fresh = SessionRecord::new(session_id(), chrono_ttl(ttl));
        if let Some(previous) = &previous {
            fresh.account_id.clone_from(&previous.account_id);
            fresh.referrer.clone_from(&previous.referrer);
            fresh.created_at = previous.created_at;
        }
        self.save(&fresh).await?;
        self.remove(
            old_id,
            previous.as_ref().and_then(|p| p.account_id.as_deref()),
        )
        .await?;
        Ok(fresh)
    }

    async fn list_by_account(&self, account_id: &str) -> SessionResult<Vec<SessionRecord>> {
        let ids: Vec<String> = self
            .client
            .smembers(self.account_key(account_id))
            .await
            .map_err(from_redis_error)?;

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(&id).await? {
                Some(session) if session.account_id.as_deref() == Some(account_id) => {
                    sessions.push(session);
                }
                _ => {
                    self.client
                        .srem::<(), _, _>(self.account_key(account_id), id)
                        .await
                        .map_err(from_redis_error)?;
                }
            }
        }
        sessions.sort_by_key(|session| session.created_at);
        Ok(sessions)
    }

    async fn destroy_by_account(&self, account_id: &str) -> SessionResult<Vec<String>> {
        let sessions = self.list_by_account(account_id).await?;
        let mut ids = Vec::with_capacity(sessions.len());
        for session in sessions {
            self.remove(&session.id, None).await?;
            ids.push(session.id);
        }
        self.client
            .del::<(), _>(self.account_key(account_id))
            .await
            .map_err(from_redis_error)?;
        Ok(ids)
    }

    async fn expiring_within(&self, window: Duration) -> SessionResult<Vec<SessionRecord>> {
        let now = Utc::now();
        self.client
            .zremrangebyscore::<(), _, _, _>(self.expiry_key(), "-inf", score(now))
            .await
            .map_err(from_redis_error)?;

        let horizon = now + chrono_ttl(window);
        let ids: Vec<String> = self
            .client
            .zrangebyscore(self.expiry_key(), score(now), score(horizon), false, None)
            .await
            .map_err(from_redis_error)?;

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.load(&id).await? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    async fn ping(&self) -> SessionResult<()> {
        let args: Vec<String> = vec![];
        self.client
            .custom::<(), _>(cmd!("PING"), args)
            .await
            .map_err(from_redis_error)
    }
}
