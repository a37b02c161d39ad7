//! `PostgreSQL` implementation of the account storage provider.

use std::collections::HashMap;

use async_trait::async_trait;
use lb_model::{Account, Identity};
use lb_storage::error::{StorageError, StorageResult};
use lb_storage::AccountProvider;
use sqlx::{PgConnection, PgPool};

use crate::convert::account_from_rows;
use crate::entities::{AccountRow, IdentityRow};
use crate::error::from_sqlx_error;

const SELECT_ACCOUNT: &str = "SELECT id, uri, name, merged_from FROM accounts";
const SELECT_IDENTITIES: &str =
    "SELECT account_id, provider_id, external_id, name, username, uri FROM account_identities";

/// `PostgreSQL` account storage provider.
pub struct PgAccountProvider {
    pool: PgPool,
}

impl PgAccountProvider {
    /// Creates a new `PostgreSQL` account provider.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn acquire(&self) -> StorageResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool.acquire().await.map_err(from_sqlx_error)
    }
}

async fn load(conn: &mut PgConnection, id: &str) -> StorageResult<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(from_sqlx_error)?;
    let Some(row) = row else {
        return Ok(None);
    };
    let identities: Vec<IdentityRow> =
        sqlx::query_as(&format!("{SELECT_IDENTITIES} WHERE account_id = $1"))
            .bind(id)
            .fetch_all(&mut *conn)
            .await
            .map_err(from_sqlx_error)?;
    Ok(Some(account_from_rows(row, identities)))
}

async fn load_existing(conn: &mut PgConnection, id: &str) -> StorageResult<Account> {
    load(conn, id)
        .await?
        .ok_or_else(|| StorageError::not_found("Account", id))
}

/// Takes row locks on the given accounts in id order.
async fn lock(conn: &mut PgConnection, ids: &[&str]) -> StorageResult<()> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    for id in sorted {
        let locked: Option<(String,)> = sqlx::query_as("SELECT id FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(from_sqlx_error)?;
        if locked.is_none() {
            return Err(StorageError::not_found("Account", id));
        }
    }
    Ok(())
}

async fn upsert_identity(
    conn: &mut PgConnection,
    account_id: &str,
    provider_id: &str,
    identity: &Identity,
) -> StorageResult<()> {
    sqlx::query(
        r"INSERT INTO account_identities (account_id, provider_id, external_id, name, username, uri)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (account_id, provider_id) DO UPDATE SET
            external_id = EXCLUDED.external_id,
            name = EXCLUDED.name,
            username = EXCLUDED.username,
            uri = EXCLUDED.uri",
    )
    .bind(account_id)
    .bind(provider_id)
    .bind(&identity.id)
    .bind(&identity.name)
    .bind(&identity.username)
    .bind(&identity.uri)
    .execute(&mut *conn)
    .await
    .map_err(from_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl AccountProvider for PgAccountProvider {
    async fn get(&self, id: &str) -> StorageResult<Option<Account>> {
        let mut conn = self.acquire().await?;
        load(&mut conn, id).await
    }

    async fn find_by_identity(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> StorageResult<Option<Account>> {
        let mut conn = self.acquire().await?;
        let owner: Option<(String,)> = sqlx::query_as(
            "SELECT account_id FROM account_identities WHERE provider_id = $1 AND external_id = $2",
        )
        .bind(provider_id)
        .bind(external_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(from_sqlx_error)?;

        match owner {
            Some((account_id,)) => load(&mut conn, &account_id).await,
            None => Ok(None),
        }
    }

    async fn find_by_merged_uri(&self, uri: &str) -> StorageResult<Option<Account>> {
        let mut conn = self.acquire().await?;
        let owner: Option<(String,)> =
            sqlx::query_as("SELECT id FROM accounts WHERE $1 = ANY(merged_from) LIMIT 1")
                .bind(uri)
                .fetch_optional(&mut *conn)
                .await
                .map_err(from_sqlx_error)?;

        match owner {
            Some((account_id,)) => load(&mut conn, &account_id).await,
            None => Ok(None),
        }
    }

    async fn find_by_uri(&self, uri: &str) -> StorageResult<Vec<Account>> {
        let mut conn = self.acquire().await?;
        let ids: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT a.id FROM accounts a \
             LEFT JOIN account_identities i ON i.account_id = a.id \
             WHERE a.uri = $1 OR $1 = ANY(a.merged_from) OR i.uri = $1 \
             ORDER BY a.id",
        )
        .bind(uri)
        .fetch_all(&mut *conn)
        .await
        .map_err(from_sqlx_error)?;

        let mut accounts = Vec::with_capacity(ids.len());
        for (id,) in ids {
            if let Some(account) = load(&mut conn, &id).await? {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    async fn list(&self) -> StorageResult<Vec<Account>> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!("{SELECT_ACCOUNT} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx_error)?;
        let identities: Vec<IdentityRow> = sqlx::query_as(SELECT_IDENTITIES)
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        let mut by_account: HashMap<String, Vec<IdentityRow>> = HashMap::new();
        for identity in identities {
            by_account
                .entry(identity.account_id.clone())
                .or_default()
                .push(identity);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let identities = by_account.remove(&row.id).unwrap_or_default();
                account_from_rows(row, identities)
            })
            .collect())
    }

    async fn create(&self, account: &Account) -> StorageResult<()> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx_error)?;

        sqlx::query("INSERT INTO accounts (id, uri, name, merged_from) VALUES ($1, $2, $3, $4)")
            .bind(&account.id)
            .bind(&account.uri)
            .bind(&account.name)
            .bind(&account.merged_from)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;

        for (provider_id, identity) in &account.identities {
            upsert_identity(&mut tx, &account.id, provider_id, identity).await?;
        }

        tx.commit().await.map_err(from_sqlx_error)
    }

    async fn attach_identity(
        &self,
        account_id: &str,
        provider_id: &str,
        identity: &Identity,
    ) -> StorageResult<Account> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx_error)?;
        lock(&mut tx, &[account_id]).await?;
        upsert_identity(&mut tx, account_id, provider_id, identity).await?;
        let account = load_existing(&mut tx, account_id).await?;
        tx.commit().await.map_err(from_sqlx_error)?;
        Ok(account)
    }

    async fn merge(&self, survivor_id: &str, absorbed_id: &str) -> StorageResult<Account> {
        if survivor_id == absorbed_id {
            return Err(StorageError::InvalidData(
                "cannot merge an account into itself".to_string(),
            ));
        }
        let mut tx = self.pool.begin().await.map_err(from_sqlx_error)?;
        lock(&mut tx, &[survivor_id, absorbed_id]).await?;

        let mut survivor = load_existing(&mut tx, survivor_id).await?;
        let absorbed = load_existing(&mut tx, absorbed_id).await?;
        survivor
            .absorb(absorbed)
            .map_err(|shared| StorageError::Conflict(shared.join(", ")))?;

        sqlx::query("UPDATE account_identities SET account_id = $1 WHERE account_id = $2")
            .bind(survivor_id)
            .bind(absorbed_id)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;
        sqlx::query("UPDATE accounts SET merged_from = $2 WHERE id = $1")
            .bind(survivor_id)
            .bind(&survivor.merged_from)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(absorbed_id)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;

        tx.commit().await.map_err(from_sqlx_error)?;
        tracing::debug!(survivor = %survivor_id, absorbed = %absorbed_id, "accounts merged");
        Ok(survivor)
    }

    async fn remove_identity(&self, account_id: &str, provider_id: &str) -> StorageResult<Account> {
        let mut tx = self.pool.begin().await.map_err(from_sqlx_error)?;
        lock(&mut tx, &[account_id]).await?;

        let mut account = load_existing(&mut tx, account_id).await?;
        if !account.identities.contains_key(provider_id) {
            return Err(StorageError::InvalidData(format!(
                "provider {provider_id} is not connected"
            )));
        }
        if account.identities.len() == 1 {
            return Err(StorageError::InvalidData(
                "cannot remove the last identity".to_string(),
            ));
        }

        sqlx::query("DELETE FROM account_identities WHERE account_id = $1 AND provider_id = $2")
            .bind(account_id)
            .bind(provider_id)
            .execute(&mut *tx)
            .await
            .map_err(from_sqlx_error)?;
        tx.commit().await.map_err(from_sqlx_error)?;

        account.identities.remove(provider_id);
        Ok(account)
    }

    async fn rename(&self, account_id: &str, name: &str) -> StorageResult<Account> {
        let mut conn = self.acquire().await?;
        let result = sqlx::query("UPDATE accounts SET name = $2 WHERE id = $1")
            .bind(account_id)
            .bind(name)
            .execute(&mut *conn)
            .await
            .map_err(from_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Account", account_id));
        }
        load_existing(&mut conn, account_id).await
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Account", id));
        }
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(from_sqlx_error)?;
        Ok(())
    }
}
