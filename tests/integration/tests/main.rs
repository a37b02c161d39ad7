//! End-to-end tests.
//!
//! Each test starts a server on an ephemeral port. Store-backed tests run
//! PostgreSQL and Redis in testcontainers.

mod common;
mod http_flows;
mod stores;
mod websocket;
