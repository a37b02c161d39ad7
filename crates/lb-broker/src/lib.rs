//! # lb-broker
//!
//! The coordinator ties a successful provider login to the stores and to
//! live connections:
//!
//! 1. reconcile the profile against the caller's account
//! 2. on a login, rotate the session id, bind the account and push
//!    `loggedIn` to the session's connections
//! 3. on an attach or merge, push `updated` to every session of the account
//! 4. on a conflict, change nothing and report the overlapping providers
//!
//! It also owns logout, account deletion and the account-management
//! operations exposed over HTTP. Every operation records an audit event.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod coordinator;
mod manage;
#[cfg(test)]
mod test_support;
pub mod view;

pub use coordinator::Coordinator;
pub use view::{LoginResult, SessionView, UserLookup};
