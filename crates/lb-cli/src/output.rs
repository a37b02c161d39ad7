//! Output formatting utilities.

use colored::Colorize;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Prompts for a password without echo.
pub fn prompt_password(prompt: &str) -> crate::CliResult<String> {
    Ok(rpassword::prompt_password(prompt)?)
}
