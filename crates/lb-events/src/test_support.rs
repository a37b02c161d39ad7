use std::sync::Arc;
use std::time::Duration;

use lb_crypto::keys::generate_rsa_keypair;
use lb_crypto::{SessionCipher, SignatureAlgorithm};
use lb_model::{Account, NormalizedProfile};
use lb_session::{MemorySessionStore, SessionStore, StoreHealth, probe_fn};
use lb_storage::{AccountProvider, MemoryAccountStore};
use lb_token::{SigningKey, TokenCodec};
use serde_json::json;
use tokio::sync::mpsc;

use crate::registry::{ConnectionId, ConnectionRegistry, RegistryConfig};
use crate::transport::{ChannelTransport, Outbound};
use crate::wire::{EventType, WireEvent};

pub(crate) const TOKEN_TTL: Duration = Duration::from_secs(10);
pub(crate) const SESSION_TTL: Duration = Duration::from_secs(3600);

pub(crate) struct Harness {
    pub registry: Arc<ConnectionRegistry>,
    pub sessions: Arc<MemorySessionStore>,
    pub accounts: Arc<MemoryAccountStore>,
    pub health: Arc<StoreHealth>,
}

impl Harness {
    pub fn new() -> Self {
        let sessions = Arc::new(MemorySessionStore::new());
        let accounts = Arc::new(MemoryAccountStore::new());

        let probe_sessions = sessions.clone();
        let health = StoreHealth::new(probe_fn(move || {
            let sessions = probe_sessions.clone();
            async move { sessions.ping().await.is_ok() }
        }));

        let keypair = generate_rsa_keypair().unwrap();
        let key = SigningKey::from_keypair(&keypair, SignatureAlgorithm::Rs256).unwrap();
        let codec = TokenCodec::new(
            key,
            Arc::new(SessionCipher::generate().unwrap()),
            sessions.clone(),
            TOKEN_TTL,
        )
        .with_health(health.clone());

        let config = RegistryConfig::new(TOKEN_TTL - Duration::from_secs(3))
            .with_about(json!({ "title": "Login Server" }))
            .with_providers(json!([{ "id": "github", "name": "GitHub" }]));

        let registry = ConnectionRegistry::new(
            Arc::new(codec),
            sessions.clone(),
            accounts.clone(),
            health.clone(),
            config,
        );

        Self {
            registry,
            sessions,
            accounts,
            health,
        }
    }

    pub fn period(&self) -> Duration {
        TOKEN_TTL - Duration::from_secs(3)
    }

    pub async fn session(&self) -> String {
        self.sessions.create(SESSION_TTL).await.unwrap().id
    }

    pub async fn account(&self) -> Account {
        let account = Account::from_profile(
            "http://localhost:3004/",
            &NormalizedProfile::new("github", "42").with_name("Ada"),
        );
        self.accounts.create(&account).await.unwrap();
        account
    }

    pub async fn login_session(&self, account: &Account) -> String {
        let id = self.session().await;
        self.sessions
            .bind_account(&id, Some(&account.id))
            .await
            .unwrap();
        id
    }

    pub async fn rotate(&self, old: &str) -> String {
        self.sessions.rotate(old, SESSION_TTL).await.unwrap().id
    }

    pub async fn connect(
        &self,
        session_id: Option<&str>,
    ) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let (transport, rx) = ChannelTransport::new(64);
        let id = self.registry.next_connection_id();
        self.registry
            .register(id, session_id.map(str::to_string), Arc::new(transport))
            .await;
        (id, rx)
    }
}

/// Drains queued text frames.
pub(crate) fn events(rx: &mut mpsc::Receiver<Outbound>) -> Vec<WireEvent> {
    let mut received = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let Outbound::Text(text) = frame {
            received.push(serde_json::from_str(&text).unwrap());
        }
    }
    received
}

pub(crate) fn event_types(rx: &mut mpsc::Receiver<Outbound>) -> Vec<EventType> {
    events(rx).into_iter().map(|e| e.event_type).collect()
}
