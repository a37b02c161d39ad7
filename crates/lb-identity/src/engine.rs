//! The reconciliation state machine.
//!
//! | caller | owner of identity      | result                         |
//! |--------|------------------------|--------------------------------|
//! | none   | none                   | `Created`                      |
//! | none   | some                   | `LoggedIn` as owner            |
//! | some   | none                   | `Attached` to caller           |
//! | some   | caller                 | `LoggedIn`, no change          |
//! | some   | other, disjoint        | `Merged` owner into caller     |
//! | some   | other, shared provider | `Conflict`, no change          |
//!
//! Writes are conditional. When a create or attach loses a race to another
//! login for the same identity the store reports a duplicate; the engine
//! then re-reads the owner and continues as if it had seen it first.

use std::sync::Arc;

use lb_core::{Error, Result};
use lb_model::{Account, NormalizedProfile};
use lb_storage::{AccountProvider, StorageError};

use crate::outcome::{Outcome, Reconciled};

const MAX_ATTEMPTS: usize = 3;

/// Decides how a freshly authenticated identity joins the account store.
#[derive(Clone)]
pub struct ReconciliationEngine {
    accounts: Arc<dyn AccountProvider>,
    base_url: String,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ReconciliationEngine {
    /// Creates an engine writing to `accounts`. `base_url` prefixes new
    /// account URIs and ends in `/`.
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountProvider>, base_url: impl Into<String>) -> Self {
        Self {
            accounts,
            base_url: base_url.into(),
        }
    }

    /// Reconciles `profile` with the caller's account.
    ///
    /// Store failures are returned, never swallowed; a merge conflict is an
    /// outcome, not an error.
    pub async fn reconcile(
        &self,
        caller: Option<&Account>,
        profile: &NormalizedProfile,
    ) -> Result<Reconciled> {
        for attempt in 1..=MAX_ATTEMPTS {
            let owner = self
                .accounts
                .find_by_identity(&profile.provider_id, &profile.id)
                .await?;

            let step = match (caller, owner) {
                (None, None) => self.create(profile).await?,
                (None, Some(owner)) => Some(Reconciled::new(owner, Outcome::LoggedIn)),
                (Some(caller), None) => self.attach(caller, profile).await?,
                (Some(caller), Some(owner)) if owner.id == caller.id => {
                    Some(Reconciled::new(owner, Outcome::LoggedIn))
                }
                (Some(caller), Some(owner)) => Some(self.merge(caller, owner).await?),
            };

            if let Some(reconciled) = step {
                tracing::debug!(
                    provider = %profile.provider_id,
                    account = %reconciled.account.id,
                    outcome = %reconciled.outcome,
                    "identity reconciled"
                );
                return Ok(reconciled);
            }
            tracing::debug!(
                provider = %profile.provider_id,
                attempt,
                "identity claimed concurrently, re-reading owner"
            );
        }

        Err(Error::Internal(format!(
            "identity {} kept changing owner during reconciliation",
            profile.provider_id
        )))
    }

    /// Returns `None` when another login created the identity first.
    async fn create(&self, profile: &NormalizedProfile) -> Result<Option<Reconciled>> {
        let account = Account::from_profile(&self.base_url, profile);
        match self.accounts.create(&account).await {
            Ok(()) => Ok(Some(Reconciled::new(account, Outcome::Created))),
            Err(err) if err.is_duplicate() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns `None` when another account claimed the identity first.
    async fn attach(
        &self,
        caller: &Account,
        profile: &NormalizedProfile,
    ) -> Result<Option<Reconciled>> {
        match self
            .accounts
            .attach_identity(&caller.id, &profile.provider_id, &profile.to_identity())
            .await
        {
            Ok(account) => Ok(Some(Reconciled::new(account, Outcome::Attached))),
            Err(err) if err.is_duplicate() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn merge(&self, caller: &Account, owner: Account) -> Result<Reconciled> {
        let caller = self
            .accounts
            .get(&caller.id)
            .await?
            .ok_or_else(|| Error::NotFound("Account".to_string()))?;

        let shared = caller.shared_providers(&owner);
        if !shared.is_empty() {
            return Ok(Reconciled::new(caller, Outcome::Conflict { providers: shared }));
        }

        match self.accounts.merge(&caller.id, &owner.id).await {
            Ok(merged) => Ok(Reconciled::merged(merged, owner.id)),
            Err(StorageError::Conflict(providers)) => {
                let providers = providers.split(", ").map(str::to_string).collect();
                Ok(Reconciled::new(caller, Outcome::Conflict { providers }))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use lb_model::Identity;
    use lb_storage::{MemoryAccountStore, StorageResult};

    const BASE: &str = "http://localhost:3004/";

    fn engine(store: Arc<MemoryAccountStore>) -> ReconciliationEngine {
        ReconciliationEngine::new(store, BASE)
    }

    fn github(id: &str) -> NormalizedProfile {
        NormalizedProfile::new("github", id).with_name("Ada Lovelace")
    }

    async fn login(engine: &ReconciliationEngine, profile: &NormalizedProfile) -> Account {
        engine.reconcile(None, profile).await.unwrap().account
    }

    #[tokio::test]
    async fn unseen_identity_creates_account() {
        let store = Arc::new(MemoryAccountStore::new());
        let engine = engine(store.clone());
        let profile = github("42").with_username("ada").with_uri("https://github.com/ada");

        let result = engine.reconcile(None, &profile).await.unwrap();

        assert_eq!(result.outcome, Outcome::Created);
        assert_eq!(result.account.identity("github"), Some(&profile.to_identity()));
        assert_eq!(result.account.name, "Ada Lovelace");
        assert!(result.account.uri.starts_with("http://localhost:3004/users/"));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn nameless_profile_falls_back_to_username_at_provider() {
        let store = Arc::new(MemoryAccountStore::new());
        let profile = NormalizedProfile::new("github", "42").with_username("ada");

        let account = login(&engine(store), &profile).await;

        assert_eq!(account.name, "ada@github");
    }

    #[tokio::test]
    async fn second_login_selects_same_account() {
        let store = Arc::new(MemoryAccountStore::new());
        let engine = engine(store.clone());

        let first = engine.reconcile(None, &github("42")).await.unwrap();
        let second = engine.reconcile(None, &github("42")).await.unwrap();

        assert_eq!(first.outcome, Outcome::Created);
        assert_eq!(second.outcome, Outcome::LoggedIn);
        assert_eq!(first.account, second.account);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn logged_in_caller_attaches_new_identity() {
        let store = Arc::new(MemoryAccountStore::new());
        let engine = engine(store.clone());
        let u1 = login(&engine, &github("42")).await;

        let result = engine
            .reconcile(Some(&u1), &NormalizedProfile::new("orcid", "0000-0001"))
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Attached);
        assert_eq!(result.account.id, u1.id);
        let keys: Vec<(&str, &str)> = result.account.identity_keys().collect();
        assert_eq!(keys, vec![("github", "42"), ("orcid", "0000-0001")]);
    }

    #[tokio::test]
    async fn reauthenticating_own_identity_is_noop() {
        let store = Arc::new(MemoryAccountStore::new());
        let engine = engine(store.clone());
        let u1 = login(&engine, &github("42")).await;

        let result = engine.reconcile(Some(&u1), &github("42")).await.unwrap();

        assert_eq!(result.outcome, Outcome::LoggedIn);
        assert_eq!(result.account, u1);
    }

    #[tokio::test]
    async fn disjoint_accounts_merge() {
        let store = Arc::new(MemoryAccountStore::new());
        let engine = engine(store.clone());
        let a = login(&engine, &github("1")).await;
        let b = login(&engine, &NormalizedProfile::new("orcid", "2")).await;

        let result = engine
            .reconcile(Some(&a), &NormalizedProfile::new("orcid", "2"))
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Merged);
        assert_eq!(result.account.id, a.id);
        assert_eq!(result.absorbed_id.as_deref(), Some(b.id.as_str()));
        assert!(result.account.owns("github", "1"));
        assert!(result.account.owns("orcid", "2"));
        assert_eq!(result.account.merged_from, vec![b.uri.clone()]);
        assert!(store.get(&b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn shared_provider_conflicts_without_mutation() {
        let store = Arc::new(MemoryAccountStore::new());
        let engine = engine(store.clone());
        let a = login(&engine, &github("1")).await;
        let b = login(&engine, &github("2")).await;
        let b = store
            .attach_identity(&b.id, "orcid", &Identity::new("3"))
            .await
            .unwrap();

        let result = engine
            .reconcile(Some(&a), &NormalizedProfile::new("orcid", "3"))
            .await
            .unwrap();

        assert_eq!(
            result.outcome,
            Outcome::Conflict {
                providers: vec!["github".to_string()]
            }
        );
        assert_eq!(store.get(&a.id).await.unwrap().unwrap(), a);
        assert_eq!(store.get(&b.id).await.unwrap().unwrap(), b);
    }

    #[tokio::test]
    async fn store_outage_propagates() {
        let store = Arc::new(MemoryAccountStore::new());
        let engine = engine(store.clone());
        store.set_available(false);

        let err = engine.reconcile(None, &github("42")).await.unwrap_err();

        assert!(err.is_unavailable());
    }

    /// Hides the owner from the first lookup, as if another login created
    /// it between our read and our write.
    struct StaleFirstRead {
        inner: MemoryAccountStore,
        stale: AtomicBool,
    }

    #[async_trait]
    impl AccountProvider for StaleFirstRead {
        async fn get(&self, id: &str) -> StorageResult<Option<Account>> {
            self.inner.get(id).await
        }
        async fn find_by_identity(&self, p: &str, e: &str) -> StorageResult<Option<Account>> {
            if self.stale.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_by_identity(p, e).await
        }
        async fn find_by_merged_uri(&self, uri: &str) -> StorageResult<Option<Account>> {
            self.inner.find_by_merged_uri(uri).await
        }
        async fn list(&self) -> StorageResult<Vec<Account>> {
            self.inner.list().await
        }
        async fn create(&self, account: &Account) -> StorageResult<()> {
            self.inner.create(account).await
        }
        async fn attach_identity(
            &self,
            account_id: &str,
            provider_id: &str,
            identity: &Identity,
        ) -> StorageResult<Account> {
            self.inner
                .attach_identity(account_id, provider_id, identity)
                .await
        }
        async fn merge(&self, survivor: &str, absorbed: &str) -> StorageResult<Account> {
            self.inner.merge(survivor, absorbed).await
        }
        async fn remove_identity(&self, account_id: &str, provider: &str) -> StorageResult<Account> {
            self.inner.remove_identity(account_id, provider).await
        }
        async fn rename(&self, account_id: &str, name: &str) -> StorageResult<Account> {
            self.inner.rename(account_id, name).await
        }
        async fn delete(&self, id: &str) -> StorageResult<()> {
            self.inner.delete(id).await
        }
        async fn ping(&self) -> StorageResult<()> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn lost_create_race_logs_into_winner() {
        let store = Arc::new(StaleFirstRead {
            inner: MemoryAccountStore::new(),
            stale: AtomicBool::new(false),
        });
        let engine = ReconciliationEngine::new(store.clone(), BASE);
        let winner = engine.reconcile(None, &github("42")).await.unwrap().account;

        store.stale.store(true, Ordering::SeqCst);
        let result = engine.reconcile(None, &github("42")).await.unwrap();

        assert_eq!(result.outcome, Outcome::LoggedIn);
        assert_eq!(result.account.id, winner.id);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lost_attach_race_merges_with_winner() {
        let store = Arc::new(StaleFirstRead {
            inner: MemoryAccountStore::new(),
            stale: AtomicBool::new(false),
        });
        let engine = ReconciliationEngine::new(store.clone(), BASE);
        let caller = engine.reconcile(None, &github("1")).await.unwrap().account;
        let winner = engine
            .reconcile(None, &NormalizedProfile::new("orcid", "2"))
            .await
            .unwrap()
            .account;

        store.stale.store(true, Ordering::SeqCst);
        let result = engine
            .reconcile(Some(&caller), &NormalizedProfile::new("orcid", "2"))
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Merged);
        assert!(result.account.merged_from.contains(&winner.uri));
    }
}
