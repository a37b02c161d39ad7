//! # lb-events
//!
//! Live event distribution for login-broker.
//!
//! - [`wire`]: the `{type, date, data}` event envelope and inbound messages
//! - [`ConnectionRegistry`]: live connections, each bound to a session id,
//!   with point-to-point and session-scoped delivery
//! - token refresh: every connection with a logged-in session owns one
//!   timer task pushing a fresh token every `TTL - 3` seconds. The task
//!   handle lives in the connection record, so removing the connection
//!   cancels it.
//! - [`ExpirySweep`]: periodic `sessionAboutToExpire` notices
//! - [`inbound`]: handling of `authenticate` and `ping` messages
//!
//! Delivery is best-effort: events for a missing or congested connection
//! are dropped. A reconnecting client re-synchronizes through a fresh
//! registration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod inbound;
mod refresh;
pub mod registry;
pub mod sweep;
#[cfg(test)]
mod test_support;
pub mod transport;
pub mod wire;

pub use registry::{ConnectionId, ConnectionRegistry, RegistryConfig};
pub use sweep::ExpirySweep;
pub use transport::{ChannelTransport, Outbound, Transport};
pub use inbound::handle_inbound;
pub use wire::{EventType, Inbound, InboundError, WireEvent, parse_inbound};
