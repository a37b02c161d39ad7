use std::sync::Arc;
use std::time::Duration;

use lb_core::event::InMemoryEventLogger;
use lb_crypto::keys::generate_rsa_keypair;
use lb_crypto::{SessionCipher, SignatureAlgorithm};
use lb_events::{
    ChannelTransport, ConnectionId, ConnectionRegistry, EventType, Outbound, RegistryConfig,
    WireEvent,
};
use lb_model::Application;
use lb_session::{MemorySessionStore, SessionStore, StoreHealth};
use lb_storage::{MemoryAccountStore, MemoryUsageStore};
use lb_token::{SigningKey, TokenCodec};
use tokio::sync::mpsc;

use crate::Coordinator;

pub(crate) const BASE_URL: &str = "http://localhost:3004/";
const TOKEN_TTL: Duration = Duration::from_secs(10);
const SESSION_TTL: Duration = Duration::from_secs(3600);

pub(crate) struct Harness {
    pub coordinator: Coordinator,
    pub sessions: Arc<MemorySessionStore>,
    pub accounts: Arc<MemoryAccountStore>,
    pub usage: Arc<MemoryUsageStore>,
    pub audit: Arc<InMemoryEventLogger>,
}

impl Harness {
    pub fn new() -> Self {
        let sessions = Arc::new(MemorySessionStore::new());
        let accounts = Arc::new(MemoryAccountStore::new());
        let usage = Arc::new(MemoryUsageStore::new());
        let audit = Arc::new(InMemoryEventLogger::new());
        let health = StoreHealth::always_available();

        let keypair = generate_rsa_keypair().unwrap();
        let key = SigningKey::from_keypair(&keypair, SignatureAlgorithm::Rs256).unwrap();
        let codec = TokenCodec::new(
            key,
            Arc::new(SessionCipher::generate().unwrap()),
            sessions.clone(),
            TOKEN_TTL,
        );

        let registry = ConnectionRegistry::new(
            Arc::new(codec),
            sessions.clone(),
            accounts.clone(),
            health,
            RegistryConfig::new(TOKEN_TTL - Duration::from_secs(3)),
        );

        let coordinator = Coordinator::new(
            accounts.clone(),
            usage.clone(),
            sessions.clone(),
            registry,
            BASE_URL,
            SESSION_TTL,
        )
        .with_audit(audit.clone())
        .with_applications(vec![Application {
            name: "Cocoda".to_string(),
            url: "https://coli-conc.gbv.de/cocoda/".to_string(),
        }]);

        Self {
            coordinator,
            sessions,
            accounts,
            usage,
            audit,
        }
    }

    pub async fn session(&self) -> String {
        self.sessions.create(SESSION_TTL).await.unwrap().id
    }

    pub async fn connect(&self, session_id: &str) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let registry = self.coordinator.registry();
        let (transport, rx) = ChannelTransport::new(64);
        let id = registry.next_connection_id();
        registry
            .register(id, Some(session_id.to_string()), Arc::new(transport))
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

/// Drains queued text frames and returns their event types.
pub(crate) fn event_types(rx: &mut mpsc::Receiver<Outbound>) -> Vec<EventType> {
    events(rx).into_iter().map(|event| event.event_type).collect()
}
