//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Operator tool for login-broker.
#[derive(Debug, Parser)]
#[command(name = "lb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Provider catalog file.
    #[arg(long, env = "PROVIDERS_PATH", default_value = "./providers.json")]
    pub providers_path: PathBuf,

    /// Database URL for account listing.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Users of `local` providers.
    #[command(subcommand)]
    Local(LocalCommand),

    /// Stored accounts.
    #[command(subcommand)]
    Users(UsersCommand),
}

/// `local` provider commands.
#[derive(Debug, Subcommand)]
pub enum LocalCommand {
    /// List the users of a provider.
    List {
        /// Provider id.
        provider: String,
    },

    /// Add a user, or replace the password of an existing one.
    AddUser {
        /// Provider id.
        provider: String,
        /// Username.
        username: String,
        /// Display name.
        #[arg(long)]
        name: Option<String>,
        /// Password. Prompted for when neither this nor `LB_PASSWORD` is set.
        #[arg(long, env = "LB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Remove a user.
    RemoveUser {
        /// Provider id.
        provider: String,
        /// Username.
        username: String,
    },
}

/// Account commands.
#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// Print accounts with their usage as JSON lines.
    ///
    /// Without ids or URIs every account is printed.
    List {
        /// Account ids, or URIs of an account, one of its identities or an
        /// account it absorbed.
        ids: Vec<String>,

        /// Only accounts connected to this provider. Repeatable; cannot be
        /// combined with ids.
        #[arg(short = 'p', long = "with-provider", conflicts_with = "ids")]
        with_provider: Vec<String>,
    },
}
