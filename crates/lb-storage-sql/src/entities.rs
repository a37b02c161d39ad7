//! Database entity types for `SQLx`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row for accounts.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub merged_from: Vec<String>,
}

/// Database row for account identities.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityRow {
    pub account_id: String,
    pub provider_id: String,
    pub external_id: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub uri: Option<String>,
}

/// Database row for usage records.
#[derive(Debug, Clone, FromRow)]
pub struct UsageRow {
    pub account_id: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}
