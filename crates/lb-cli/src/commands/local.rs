//! Users of `local` providers.
//!
//! Edits `options.users` of a `local` entry in the provider catalog. Other
//! entries and fields are written back unchanged.

use std::path::Path;

use lb_auth::PasswordHasherService;
use lb_auth::catalog::{read_raw, write_raw};
use serde_json::{Map, Value, json};

use crate::cli::LocalCommand;
use crate::output::{info, prompt_password, success};
use crate::{CliError, CliResult};

/// Runs a `local` command.
pub fn run_local(cmd: LocalCommand, providers_path: &Path) -> CliResult<()> {
    match cmd {
        LocalCommand::List { provider } => {
            let users = list_users(providers_path, &provider)?;
            if users.is_empty() {
                info("No users.");
            }
            for (username, name) in users {
                match name {
                    Some(name) => println!("{username}\t{name}"),
                    None => println!("{username}"),
                }
            }
            Ok(())
        }
        LocalCommand::AddUser {
            provider,
            username,
            name,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password(&format!("Password for {username}: "))?,
            };
            let hasher = PasswordHasherService::default();
            let created = add_user(
                providers_path,
                &provider,
                &username,
                name.as_deref(),
                &password,
                &hasher,
            )?;
            if created {
                success(&format!("Added user {username} to {provider}"));
            } else {
                success(&format!("Updated user {username} of {provider}"));
            }
            Ok(())
        }
        LocalCommand::RemoveUser { provider, username } => {
            remove_user(providers_path, &provider, &username)?;
            success(&format!("Removed user {username} from {provider}"));
            Ok(())
        }
    }
}

/// Returns `(username, display name)` of every user of the provider.
pub fn list_users(path: &Path, provider: &str) -> CliResult<Vec<(String, Option<String>)>> {
    let mut entries = read_raw(path)?;
    let users = users_mut(&mut entries, provider)?;
    Ok(users
        .iter()
        .filter_map(|user| {
            let username = user.get("username")?.as_str()?.to_string();
            let name = user
                .get("displayName")
                .and_then(Value::as_str)
                .map(str::to_string);
            Some((username, name))
        })
        .collect())
}

/// Adds a user with an argon2 hash of `password`, or replaces the hash
/// (and the display name, if given) of an existing one. Returns whether
/// the user is new.
pub fn add_user(
    path: &Path,
    provider: &str,
    username: &str,
    name: Option<&str>,
    password: &str,
    hasher: &PasswordHasherService,
) -> CliResult<bool> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(CliError::InvalidArgument(
            "username and password must not be empty".to_string(),
        ));
    }
    let hash = hasher.hash(password)?;

    let mut entries = read_raw(path)?;
    let users = users_mut(&mut entries, provider)?;

    let existing = users
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|user| user.get("username").and_then(Value::as_str) == Some(username));
    let created = match existing {
        Some(user) => {
            user.insert("password".to_string(), json!(hash));
            if let Some(name) = name {
                user.insert("displayName".to_string(), json!(name));
            }
            false
        }
        None => {
            let mut user = Map::new();
            user.insert("username".to_string(), json!(username));
            user.insert("password".to_string(), json!(hash));
            user.insert("displayName".to_string(), json!(name.unwrap_or(username)));
            users.push(Value::Object(user));
            true
        }
    };

    write_raw(path, &entries)?;
    Ok(created)
}

/// Removes a user.
pub fn remove_user(path: &Path, provider: &str, username: &str) -> CliResult<()> {
    let mut entries = read_raw(path)?;
    let users = users_mut(&mut entries, provider)?;
    let before = users.len();
    users.retain(|user| user.get("username").and_then(Value::as_str) != Some(username));
    if users.len() == before {
        return Err(CliError::not_found("User", username));
    }
    write_raw(path, &entries)?;
    Ok(())
}

/// Returns `options.users` of the `local` entry `provider`, creating the
/// list if it is missing.
fn users_mut<'a>(entries: &'a mut [Value], provider: &str) -> CliResult<&'a mut Vec<Value>> {
    let entry = entries
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|entry| entry.get("id").and_then(Value::as_str) == Some(provider))
        .ok_or_else(|| CliError::not_found("Provider", provider))?;

    if entry.get("strategy").and_then(Value::as_str) != Some("local") {
        return Err(CliError::InvalidArgument(format!(
            "provider {provider} does not use the local strategy"
        )));
    }

    let options = entry
        .entry("options")
        .or_insert_with(|| json!({}));
    if !options.is_object() {
        *options = json!({});
    }
    let users = options
        .as_object_mut()
        .map(|options| options.entry("users").or_insert_with(|| json!([])))
        .ok_or_else(|| CliError::InvalidArgument("options must be an object".to_string()))?;
    if !users.is_array() {
        *users = json!([]);
    }
    users
        .as_array_mut()
        .ok_or_else(|| CliError::InvalidArgument("options.users must be a list".to_string()))
}
