//! # lb-identity
//!
//! Identity reconciliation for login-broker.
//!
//! Given a freshly authenticated external profile and the caller's current
//! account (if any), [`ReconciliationEngine::reconcile`] decides whether to
//! create an account, log into an existing one, attach the identity, merge
//! two accounts, or refuse a merge whose accounts share a provider.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod outcome;

pub use engine::ReconciliationEngine;
pub use outcome::{Outcome, Reconciled};
