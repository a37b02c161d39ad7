//! Account usage records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-use bookkeeping for an account, upserted on authenticated requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Account the record belongs to.
    pub account_id: String,
    /// First recorded use.
    pub created_at: DateTime<Utc>,
    /// Most recent use.
    pub last_used_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Creates a record for a first use at `at`.
    #[must_use]
    pub fn first_use(account_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            account_id: account_id.into(),
            created_at: at,
            last_used_at: at,
        }
    }
}
