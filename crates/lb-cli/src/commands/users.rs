//! Stored accounts.

use std::collections::BTreeMap;

use lb_model::Account;
use lb_storage::{AccountProvider, UsageProvider};
use lb_storage_sql::{PgAccountProvider, PgUsageProvider, PoolConfig, create_pool};
use serde_json::{Value, json};
use url::Url;

use crate::cli::UsersCommand;
use crate::{CliError, CliResult};

/// Runs a `users` command.
pub async fn run_users(cmd: UsersCommand, database_url: Option<&str>) -> CliResult<()> {
    let url = database_url.ok_or_else(|| {
        CliError::InvalidArgument("DATABASE_URL is required to list accounts".to_string())
    })?;
    let pool = create_pool(&PoolConfig::new(url).max_connections(1))?;
    let accounts = PgAccountProvider::new(pool.clone());
    let usage = PgUsageProvider::new(pool);

    match cmd {
        UsersCommand::List { ids, with_provider } => {
            for account in select_accounts(&accounts, &ids, &with_provider).await? {
                println!("{}", with_usage(&account, &usage).await?);
            }
            Ok(())
        }
    }
}

/// Selects accounts by id or URI, or by connected provider.
///
/// A query that parses as an absolute URL is matched against account,
/// identity and absorbed-account URIs; anything else is an account id.
/// Unknown ids are skipped. The result is ordered by id without
/// duplicates.
pub async fn select_accounts(
    accounts: &dyn AccountProvider,
    ids: &[String],
    providers: &[String],
) -> CliResult<Vec<Account>> {
    if !ids.is_empty() && !providers.is_empty() {
        return Err(CliError::InvalidArgument(
            "--with-provider can only be used if no user ID/URI is given".to_string(),
        ));
    }

    if ids.is_empty() {
        let all = accounts.list().await?;
        return Ok(all
            .into_iter()
            .filter(|account| {
                providers.is_empty()
                    || providers.iter().any(|p| account.identity(p).is_some())
            })
            .collect());
    }

    let mut selected = BTreeMap::new();
    for query in ids {
        if Url::parse(query).is_ok() {
            for account in accounts.find_by_uri(query).await? {
                selected.insert(account.id.clone(), account);
            }
        } else if let Some(account) = accounts.get(query).await? {
            selected.insert(account.id.clone(), account);
        }
    }
    Ok(selected.into_values().collect())
}

/// Renders an account with its usage record under `usage`.
pub async fn with_usage(account: &Account, usage: &dyn UsageProvider) -> CliResult<Value> {
    let record = usage.get(&account.id).await?;
    let mut value = serde_json::to_value(account)?;
    if let Value::Object(map) = &mut value {
        map.insert(
            "usage".to_string(),
            record.map_or(Value::Null, |r| {
                json!({ "createdAt": r.created_at, "lastUsedAt": r.last_used_at })
            }),
        );
    }
    Ok(value)
}
