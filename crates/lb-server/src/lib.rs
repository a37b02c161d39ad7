//! # lb-server
//!
//! HTTP and WebSocket front end of login-broker.
//!
//! The server exposes the provider catalog, credential logins, account and
//! session management, token issuance and a WebSocket endpoint on `/`
//! through which clients receive `loggedIn`, `loggedOut`, `updated`,
//! `token` and `sessionAboutToExpire` events.
//!
//! ## Usage
//!
//! ```ignore
//! use lb_server::Server;
//!
//! let config = lb_core::Config::from_env()?;
//! Server::new(config).await?.run().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handlers;
pub mod router;
pub mod session;
pub mod state;

pub use router::create_router;
pub use state::{AppState, Stores};

use axum::Router;
use lb_core::Config;
use tokio::net::TcpListener;

/// The login-broker server.
#[derive(Debug)]
pub struct Server {
    state: AppState,
}

impl Server {
    /// Connects the stores and builds the application state.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let stores = Stores::connect(&config).await?;
        Self::with_stores(config, stores)
    }

    /// Builds a server on top of existing stores.
    pub fn with_stores(config: Config, stores: Stores) -> anyhow::Result<Self> {
        Ok(Self {
            state: AppState::new(config, stores)?,
        })
    }

    /// Returns the application state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Creates the router without starting a listener.
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Binds the configured address and serves until a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.state.config.bind_address()).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` completes. Starts the session
    /// expiry sweep for the lifetime of the server.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let sweep = self.state.sweep.spawn();
        let app = self.router();

        tracing::info!(
            %addr,
            base_url = %self.state.config.server.base_url,
            "login-broker listening"
        );

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;
        sweep.abort();
        result?;

        tracing::info!("server shutdown complete");
        Ok(())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
