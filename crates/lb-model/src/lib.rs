//! # lb-model
//!
//! Domain models for login-broker.
//!
//! An [`Account`] aggregates one or more provider-scoped [`Identity`]
//! records. Adapters hand the core a [`NormalizedProfile`]; sessions and
//! usage records are plain data owned by their stores.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod application;
pub mod identity;
pub mod provider;
pub mod session;
pub mod usage;

pub use account::{Account, AccountSummary};
pub use application::Application;
pub use identity::{Identity, NormalizedProfile};
pub use provider::{ProviderConfig, ProviderInfo};
pub use session::SessionRecord;
pub use usage::UsageRecord;
