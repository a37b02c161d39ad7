//! # lb-cli
//!
//! Operator tools for login-broker:
//! - managing users of `local` providers in the provider catalog
//! - listing accounts stored in the database

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use error::{CliError, CliResult};
