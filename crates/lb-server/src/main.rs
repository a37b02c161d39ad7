//! # login-broker
//!
//! Main entry point for the login-broker server.

#![forbid(unsafe_code)]

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = lb_core::Config::from_env()?;
    tracing::info!(env = %config.server.env, "login-broker starting");

    lb_server::Server::new(config).await?.run().await
}
