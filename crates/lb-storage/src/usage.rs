//! Usage storage provider trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lb_model::UsageRecord;

use crate::error::StorageResult;

/// Provider for account usage bookkeeping.
#[async_trait]
pub trait UsageProvider: Send + Sync {
    /// Records a use of `account_id` at `at`, creating the record on first
    /// use.
    async fn touch(&self, account_id: &str, at: DateTime<Utc>) -> StorageResult<UsageRecord>;

    /// Gets the usage record for an account.
    async fn get(&self, account_id: &str) -> StorageResult<Option<UsageRecord>>;

    /// Deletes the usage record for an account. Missing records are ignored.
    async fn delete(&self, account_id: &str) -> StorageResult<()>;
}
