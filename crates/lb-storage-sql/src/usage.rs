//! `PostgreSQL` implementation of the usage storage provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lb_model::UsageRecord;
use lb_storage::UsageProvider;
use lb_storage::error::StorageResult;
use sqlx::PgPool;

use crate::convert::usage_from_row;
use crate::entities::UsageRow;
use crate::error::from_sqlx_error;

/// `PostgreSQL` usage storage provider.
pub struct PgUsageProvider {
    pool: PgPool,
}

impl PgUsageProvider {
    /// Creates a new `PostgreSQL` usage provider.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageProvider for PgUsageProvider {
    async fn touch(&self, account_id: &str, at: DateTime<Utc>) -> StorageResult<UsageRecord> {
        let row: UsageRow = sqlx::query_as(
            r"INSERT INTO usage (account_id, created_at, last_used_at) VALUES ($1, $2, $2)
            ON CONFLICT (account_id) DO UPDATE SET last_used_at = EXCLUDED.last_used_at
            RETURNING account_id, created_at, last_used_at",
        )
        .bind(account_id)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx_error)?;
        Ok(usage_from_row(row))
    }

    async fn get(&self, account_id: &str) -> StorageResult<Option<UsageRecord>> {
        let row: Option<UsageRow> = sqlx::query_as(
            "SELECT account_id, created_at, last_used_at FROM usage WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx_error)?;
        Ok(row.map(usage_from_row))
    }

    async fn delete(&self, account_id: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM usage WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx_error)?;
        Ok(())
    }
}
