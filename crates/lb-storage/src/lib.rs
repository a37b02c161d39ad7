//! # lb-storage
//!
//! Storage abstractions for accounts and usage records.
//!
//! The reconciliation engine relies on the account store for one guarantee
//! above all: an external identity `(provider id, external id)` belongs to
//! at most one account. Writes that could break this are conditional and
//! fail with [`StorageError::Duplicate`] instead of silently overwriting.
//!
//! [`memory`] provides an in-process implementation used in tests and in
//! deployments without a database.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod error;
pub mod memory;
pub mod usage;

pub use account::AccountProvider;
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryAccountStore, MemoryUsageStore};
pub use usage::UsageProvider;
