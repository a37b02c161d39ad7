//! Account storage provider trait.

use async_trait::async_trait;
use lb_model::{Account, Identity};

use crate::error::StorageResult;

/// Provider for account storage operations.
///
/// Implementations must be thread-safe and support concurrent access. Every
/// write that assigns an external identity is conditional: it fails with
/// `StorageError::Duplicate` when another account already owns the
/// identity, so two racing logins cannot both create an account for it.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Gets an account by id.
    async fn get(&self, id: &str) -> StorageResult<Option<Account>>;

    /// Finds the account owning `(provider_id, external_id)`.
    async fn find_by_identity(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> StorageResult<Option<Account>>;

    /// Finds the account that absorbed the account with `uri`.
    async fn find_by_merged_uri(&self, uri: &str) -> StorageResult<Option<Account>>;

    /// Finds the accounts `uri` refers to: an account URI, an identity URI
    /// or the URI of an absorbed account. Ordered by id.
    async fn find_by_uri(&self, uri: &str) -> StorageResult<Vec<Account>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|account| account.answers_to(uri))
            .collect())
    }

    /// Lists all accounts ordered by id.
    async fn list(&self) -> StorageResult<Vec<Account>>;

    /// Creates a new account.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the id or any of its identities
    /// is already taken.
    async fn create(&self, account: &Account) -> StorageResult<()>;

    /// Attaches (or replaces) the identity for `provider_id` on an account.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the account doesn't exist and
    /// `StorageError::Duplicate` if another account owns the identity.
    async fn attach_identity(
        &self,
        account_id: &str,
        provider_id: &str,
        identity: &Identity,
    ) -> StorageResult<Account>;

    /// Moves every identity of `absorbed_id` onto `survivor_id` and deletes
    /// the absorbed account, atomically.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Conflict` if both accounts hold an identity
    /// from the same provider; neither account is modified in that case.
    async fn merge(&self, survivor_id: &str, absorbed_id: &str) -> StorageResult<Account>;

    /// Removes the identity for `provider_id` from an account.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::InvalidData` if it is the account's last
    /// identity or the provider is not connected.
    async fn remove_identity(&self, account_id: &str, provider_id: &str) -> StorageResult<Account>;

    /// Changes an account's display name.
    async fn rename(&self, account_id: &str, name: &str) -> StorageResult<Account>;

    /// Deletes an account and all its identities.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the account doesn't exist.
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Checks connectivity.
    async fn ping(&self) -> StorageResult<()>;
}
