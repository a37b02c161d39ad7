//! # lb
//!
//! Operator command-line tool for login-broker.

#![forbid(unsafe_code)]

use clap::Parser;
use lb_cli::cli::{Cli, Command};
use lb_cli::commands::{run_local, run_users};
use lb_cli::output::error;

#[tokio::main]
async fn main() {
    // Missing .env is not an error
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Local(cmd) => run_local(cmd, &cli.providers_path),
        Command::Users(cmd) => run_users(cmd, cli.database_url.as_deref()).await,
    };

    if let Err(e) = result {
        error(&e.to_string());
        std::process::exit(1);
    }
}
