//! # lb-session
//!
//! Session management for login-broker.
//!
//! - [`SessionStore`]: the operations the broker needs from a session
//!   backend. Every connectivity failure surfaces as
//!   [`SessionError::Unavailable`].
//! - [`StoreHealth`]: shared connectivity state. Components report an
//!   outage, a background probe polls until the stores answer again, and
//!   paused work waits on [`StoreHealth::wait_available`].
//! - [`MemorySessionStore`]: in-process backend for tests and single-node
//!   deployments.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod health;
pub mod memory;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use health::{ProbeFn, StoreHealth, probe_fn};
pub use memory::MemorySessionStore;
pub use store::SessionStore;
