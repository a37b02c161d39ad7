//! SQL storage error mapping.

use lb_storage::StorageError;
use sqlx::Error as SqlxError;

/// Converts a `SQLx` error to a storage error.
///
/// Connectivity failures become `StorageError::Unavailable` so callers can
/// tell an outage from a bad query.
#[allow(clippy::needless_pass_by_value)]
pub fn from_sqlx_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::RowNotFound => StorageError::Internal("Row not found".to_string()),
        SqlxError::Database(db_err) => {
            // PostgreSQL unique_violation
            if db_err.code().is_some_and(|c| c == "23505") {
                let constraint = db_err.constraint().unwrap_or("unique key").to_string();
                if constraint.starts_with("account_identities") {
                    StorageError::duplicate("Identity", "provider/external id", constraint)
                } else {
                    StorageError::duplicate("Account", "id", constraint)
                }
            } else {
                StorageError::Query(db_err.to_string())
            }
        }
        SqlxError::PoolTimedOut => StorageError::Unavailable("Connection pool timeout".to_string()),
        SqlxError::PoolClosed => StorageError::Unavailable("Connection pool closed".to_string()),
        SqlxError::Io(e) => StorageError::Unavailable(e.to_string()),
        SqlxError::Tls(e) => StorageError::Unavailable(e.to_string()),
        _ => StorageError::Internal(err.to_string()),
    }
}
