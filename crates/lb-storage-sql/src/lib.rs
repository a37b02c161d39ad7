//! # lb-storage-sql
//!
//! SQLx-based `PostgreSQL` storage for accounts and usage records.
//!
//! The identity ownership invariant is enforced by the schema itself:
//! `account_identities` carries a unique constraint on
//! `(provider_id, external_id)`, and violations surface as
//! `StorageError::Duplicate`. Multi-row changes (create, merge, identity
//! removal) run in a single transaction.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
mod convert;
mod entities;
pub mod error;
pub mod pool;
pub mod usage;

pub use account::PgAccountProvider;
pub use pool::{PoolConfig, create_pool, run_migrations};
pub use usage::PgUsageProvider;
