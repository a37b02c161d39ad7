//! # lb-session-redis
//!
//! Redis implementation of [`lb_session::SessionStore`] using the `fred`
//! crate.
//!
//! Layout, with the default `lb` prefix:
//!
//! - `lb:session:<id>`: the JSON session record, with an `EX` matching its
//!   expiry
//! - `lb:account-sessions:<accountId>`: set of session ids bound to an
//!   account
//! - `lb:session-expiry`: sorted set of session ids scored by expiry epoch
//!   seconds, used by the expiry sweep
//!
//! The client reconnects with a constant backoff. Commands time out instead
//! of queueing during an outage, so callers see
//! [`lb_session::SessionError::Unavailable`] quickly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod store;

pub use config::RedisConfig;
pub use store::RedisSessionStore;
