//! # lb-core
//!
//! Configuration, error taxonomy and audit events for login-broker.
//!
//! Every other crate in the workspace depends on this one. It owns the
//! process configuration (loaded from the environment), the user-facing
//! error taxonomy that request handlers and the connection layer render,
//! and the structured audit event records emitted by the coordinator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;

pub use config::Config;
pub use error::{Error, Result};
