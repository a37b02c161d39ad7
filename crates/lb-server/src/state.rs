//! Application state management.
//!
//! This module wires configuration, keys, stores and the coordinator into
//! the state shared by every request handler.

use std::sync::Arc;

use anyhow::Context;
use lb_auth::AdapterRegistry;
use lb_broker::Coordinator;
use lb_core::Config;
use lb_crypto::{SessionCipher, SignatureAlgorithm, load_or_generate_keypair};
use lb_events::{ConnectionRegistry, ExpirySweep, RegistryConfig};
use lb_session::{MemorySessionStore, SessionStore, StoreHealth, probe_fn};
use lb_session_redis::{RedisConfig, RedisSessionStore};
use lb_storage::{AccountProvider, MemoryAccountStore, MemoryUsageStore, UsageProvider};
use lb_storage_sql::{PgAccountProvider, PgUsageProvider, PoolConfig, create_pool, run_migrations};
use lb_token::{SigningKey, TokenCodec};
use serde_json::{Value, json};

/// Account, usage and session stores.
#[derive(Clone)]
pub struct Stores {
    /// Account store.
    pub accounts: Arc<dyn AccountProvider>,
    /// Usage store.
    pub usage: Arc<dyn UsageProvider>,
    /// Session store.
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    /// In-memory stores.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountStore::new()),
            usage: Arc::new(MemoryUsageStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }

    /// Connects the configured stores. A missing database or Redis URL
    /// selects the in-memory store for that part.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let mut stores = Self::memory();

        if let Some(url) = &config.store.database_url {
            let pool_config = PoolConfig::new(url)
                .min_connections(config.store.db_min_connections)
                .max_connections(config.store.db_max_connections);
            let pool = create_pool(&pool_config)?;
            run_migrations(&pool).await?;
            stores.accounts = Arc::new(PgAccountProvider::new(pool.clone()));
            stores.usage = Arc::new(PgUsageProvider::new(pool));
            tracing::info!("using PostgreSQL account store");
        } else {
            tracing::warn!("DATABASE_URL not set, accounts are kept in memory");
        }

        if let Some(url) = &config.store.redis_url {
            let store = RedisSessionStore::connect(RedisConfig::new(url)).await?;
            stores.sessions = Arc::new(store);
            tracing::info!("using Redis session store");
        } else {
            tracing::warn!("REDIS_URL not set, sessions are kept in memory");
        }

        Ok(stores)
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Arc<Config>,
    /// Login and account coordinator.
    pub coordinator: Arc<Coordinator>,
    /// Provider adapters.
    pub adapters: Arc<AdapterRegistry>,
    /// Stores.
    pub stores: Stores,
    /// Store availability.
    pub health: Arc<StoreHealth>,
    /// Expiry notifier, started by the server.
    pub sweep: Arc<ExpirySweep>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("base_url", &self.config.server.base_url)
            .field("adapters", &self.adapters)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Loads keys and the provider catalog, then wires everything on top
    /// of `stores`.
    pub fn new(config: Config, stores: Stores) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let algorithm: SignatureAlgorithm = config
            .token
            .algorithm
            .parse()
            .context("unsupported token algorithm")?;
        let (keypair, _) =
            load_or_generate_keypair(&config.token.private_key_path, &config.token.public_key_path)
                .context("loading signing keys")?;
        let (cipher, _) = SessionCipher::load_or_generate(&config.token.session_key_path)
            .context("loading session key")?;

        let health = store_health(&stores);
        let codec = TokenCodec::new(
            SigningKey::from_keypair(&keypair, algorithm)?,
            Arc::new(cipher),
            stores.sessions.clone(),
            config.token.ttl(),
        )
        .with_health(health.clone());
        codec.self_check().context("token keypair self check")?;

        let providers = lb_auth::catalog::load_providers(
            &config.providers_path,
            &config.server.base_url,
        )?;
        let adapters = Arc::new(AdapterRegistry::from_catalog(providers)?);
        let applications = lb_auth::catalog::load_applications(&config.applications_path);

        let about = about_json(&config, &codec);
        let registry_config = RegistryConfig::new(config.token.refresh_period())
            .with_about(about)
            .with_providers(json!(adapters.public_catalog()));
        let registry = ConnectionRegistry::new(
            Arc::new(codec),
            stores.sessions.clone(),
            stores.accounts.clone(),
            health.clone(),
            registry_config,
        );

        let sweep = ExpirySweep::new(
            registry.clone(),
            stores.sessions.clone(),
            config.session.expiration_threshold(),
            config.session.expiration_interval(),
        );

        let coordinator = Coordinator::new(
            stores.accounts.clone(),
            stores.usage.clone(),
            stores.sessions.clone(),
            registry,
            config.server.base_url.clone(),
            config.session.max_age(),
        )
        .with_applications(applications);

        tracing::info!(providers = adapters.len(), "application state ready");
        Ok(Self {
            config,
            coordinator: Arc::new(coordinator),
            adapters,
            stores,
            health,
            sweep,
        })
    }

    /// Returns the connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.coordinator.registry()
    }

    /// Returns the token codec.
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        self.registry().codec()
    }

    /// Checks both stores.
    pub async fn stores_ready(&self) -> bool {
        let (accounts, sessions) =
            tokio::join!(self.stores.accounts.ping(), self.stores.sessions.ping());
        accounts.is_ok() && sessions.is_ok()
    }
}

fn store_health(stores: &Stores) -> Arc<StoreHealth> {
    let accounts = stores.accounts.clone();
    let sessions = stores.sessions.clone();
    StoreHealth::new(probe_fn(move || {
        let accounts = accounts.clone();
        let sessions = sessions.clone();
        async move { accounts.ping().await.is_ok() && sessions.ping().await.is_ok() }
    }))
}

/// Builds the body of `/about`, also sent as the `about` event.
pub(crate) fn about_json(config: &Config, codec: &TokenCodec) -> Value {
    json!({
        "title": config.about.title,
        "env": config.server.env,
        "publicKey": codec.public_key(),
        "algorithm": codec.algorithm().jwa_name(),
        "urls": {
            "imprint": config.about.imprint_url,
            "privacy": config.about.privacy_url,
            "sources": config.about.sources_url,
        },
    })
}
