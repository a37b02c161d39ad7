//! In-memory account and usage stores.
//!
//! For production with multiple instances, use the PostgreSQL providers.
//! Both stores have an outage switch so callers can exercise their
//! store-unavailable paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lb_model::{Account, Identity, UsageRecord};
use parking_lot::RwLock;

use crate::account::AccountProvider;
use crate::error::{StorageError, StorageResult};
use crate::usage::UsageProvider;

type IdentityKey = (String, String);

#[derive(Default)]
struct AccountTable {
    accounts: HashMap<String, Account>,
    owners: HashMap<IdentityKey, String>,
}

impl AccountTable {
    fn owner_of(&self, provider_id: &str, external_id: &str) -> Option<&String> {
        self.owners
            .get(&(provider_id.to_string(), external_id.to_string()))
    }

    fn index(&mut self, account: &Account) {
        for (provider, external) in account.identity_keys() {
            self.owners
                .insert((provider.to_string(), external.to_string()), account.id.clone());
        }
    }

    fn unindex(&mut self, account: &Account) {
        for (provider, external) in account.identity_keys() {
            self.owners
                .remove(&(provider.to_string(), external.to_string()));
        }
    }
}

fn outage() -> StorageError {
    StorageError::Unavailable("in-memory store switched off".to_string())
}

/// In-memory account store.
#[derive(Default)]
pub struct MemoryAccountStore {
    table: RwLock<AccountTable>,
    unavailable: AtomicBool,
}

impl MemoryAccountStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: while unavailable every call fails with
    /// `StorageError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(outage())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AccountProvider for MemoryAccountStore {
    async fn get(&self, id: &str) -> StorageResult<Option<Account>> {
        self.check()?;
        Ok(self.table.read().accounts.get(id).cloned())
    }

    async fn find_by_identity(
        &self,
        provider_id: &str,
        external_id: &str,
    ) -> StorageResult<Option<Account>> {
        self.check()?;
        let table = self.table.read();
        Ok(table
            .owner_of(provider_id, external_id)
            .and_then(|id| table.accounts.get(id))
            .cloned())
    }

    async fn find_by_merged_uri(&self, uri: &str) -> StorageResult<Option<Account>> {
        self.check()?;
        Ok(self
            .table
            .read()
            .accounts
            .values()
            .find(|account| account.merged_from.iter().any(|merged| merged == uri))
            .cloned())
    }

    async fn list(&self) -> StorageResult<Vec<Account>> {
        self.check()?;
        let mut accounts: Vec<Account> = self.table.read().accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    async fn create(&self, account: &Account) -> StorageResult<()> {
        self.check()?;
        let mut table = self.table.write();
        if table.accounts.contains_key(&account.id) {
            return Err(StorageError::duplicate("Account", "id", account.id.clone()));
        }
        if let Some((provider, external)) = account
            .identity_keys()
            .find(|(provider, external)| table.owner_of(provider, external).is_some())
        {
            return Err(StorageError::identity_taken(provider, external));
        }
        table.index(account);
        table.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn attach_identity(
        &self,
        account_id: &str,
        provider_id: &str,
        identity: &Identity,
    ) -> StorageResult<Account> {
        self.check()?;
        let mut table = self.table.write();
        if !table.accounts.contains_key(account_id) {
            return Err(StorageError::not_found("Account", account_id));
        }
        if let Some(owner) = table.owner_of(provider_id, &identity.id) {
            if owner != account_id {
                return Err(StorageError::identity_taken(provider_id, &identity.id));
            }
        }

        let previous = table
            .accounts
            .get(account_id)
            .and_then(|account| account.identity(provider_id))
            .map(|old| old.id.clone());
        if let Some(old) = previous {
            table.owners.remove(&(provider_id.to_string(), old));
        }
        table.owners.insert(
            (provider_id.to_string(), identity.id.clone()),
            account_id.to_string(),
        );

        let account = table
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StorageError::not_found("Account", account_id))?;
        account
            .identities
            .insert(provider_id.to_string(), identity.clone());
        Ok(account.clone())
    }

    async fn merge(&self, survivor_id: &str, absorbed_id: &str) -> StorageResult<Account> {
        self.check()?;
        if survivor_id == absorbed_id {
            return Err(StorageError::InvalidData(
                "cannot merge an account into itself".to_string(),
            ));
        }
        let mut table = self.table.write();
        let mut survivor = table
            .accounts
            .get(survivor_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Account", survivor_id))?;
        let absorbed = table
            .accounts
            .get(absorbed_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Account", absorbed_id))?;

        survivor
            .absorb(absorbed.clone())
            .map_err(|shared| StorageError::Conflict(shared.join(", ")))?;

        table.unindex(&absorbed);
        table.accounts.remove(absorbed_id);
        table.index(&survivor);
        table
            .accounts
            .insert(survivor.id.clone(), survivor.clone());
        Ok(survivor)
    }

    async fn remove_identity(&self, account_id: &str, provider_id: &str) -> StorageResult<Account> {
        self.check()?;
        let mut table = self.table.write();
        let account = table
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StorageError::not_found("Account", account_id))?;
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
        let removed = account.identities.remove(provider_id);
        let updated = account.clone();
        if let Some(identity) = removed {
            table.owners.remove(&(provider_id.to_string(), identity.id));
        }
        Ok(updated)
    }

    async fn rename(&self, account_id: &str, name: &str) -> StorageResult<Account> {
        self.check()?;
        let mut table = self.table.write();
        let account = table
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| StorageError::not_found("Account", account_id))?;
        account.name = name.to_string();
        Ok(account.clone())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.check()?;
        let mut table = self.table.write();
        let account = table
            .accounts
            .remove(id)
            .ok_or_else(|| StorageError::not_found("Account", id))?;
        table.unindex(&account);
        Ok(())
    }

    async fn ping(&self) -> StorageResult<()> {
        self.check()
    }
}

/// In-memory usage store.
#[derive(Default)]
pub struct MemoryUsageStore {
    records: RwLock<HashMap<String, UsageRecord>>,
    unavailable: AtomicBool,
}

impl MemoryUsageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(outage())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UsageProvider for MemoryUsageStore {
    async fn touch(&self, account_id: &str, at: DateTime<Utc>) -> StorageResult<UsageRecord> {
        self.check()?;
        let mut records = self.records.write();
        let record = records
            .entry(account_id.to_string())
            .and_modify(|record| record.last_used_at = at)
            .or_insert_with(|| UsageRecord::first_use(account_id, at));
        Ok(record.clone())
    }

    async fn get(&self, account_id: &str) -> StorageResult<Option<UsageRecord>> {
        self.check()?;
        Ok(self.records.read().get(account_id).cloned())
    }

    async fn delete(&self, account_id: &str) -> StorageResult<()> {
        self.check()?;
        self.records.write().remove(account_id);
        Ok(())
    }
}
