//! # lb-auth
//!
//! Provider adapters for login-broker.
//!
//! Every catalog entry names a `strategy`. At startup the
//! [`AdapterRegistry`] maps each entry to a constructor from a fixed table
//! and refuses to start on an unknown strategy or malformed options. At
//! request time an adapter turns credentials, or the raw profile handed
//! over by a redirect flow, into a [`NormalizedProfile`].
//!
//! ## Built-in strategies
//!
//! - `test`: plain-text users from the catalog, for development
//! - `local`: argon2-hashed users from the catalog
//! - `script`: an external program decides
//! - `ldap`: service bind, search, user bind
//! - `github`, `orcid`, `mediawiki`, `stackexchange`, `easydb`, `cbs`:
//!   listed in the public catalog only. The broker runs no redirect flow;
//!   their adapters implement [`ProviderAdapter::normalize`] for a flow
//!   hosted elsewhere, and a credential login against them is refused
//!   with [`AuthError::Unsupported`].
//!
//! [`NormalizedProfile`]: lb_model::NormalizedProfile

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod adapters;
pub mod catalog;
pub mod error;
pub mod password;
pub mod registry;
pub mod template;

pub use adapter::{Credentials, ProviderAdapter};
pub use error::{AuthError, AuthResult};
pub use password::{PasswordHasherService, PasswordPolicy};
pub use registry::AdapterRegistry;
