//! In-memory account store for tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use bazaar_core::{AccountId, AccountRole, AccountStatus, Email, Phone};

use super::{AccountStore, RepositoryError};
use crate::models::{Account, NewAccount};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<AccountId, (Account, String)>,
    fail_create: bool,
    fail_delete: bool,
}

/// In-memory account store.
///
/// Backs saga tests; offers inspection helpers and failure toggles in the
/// same spirit as the Postgres store's error surface.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryAccountStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create` calls fail as unavailable.
    pub fn set_fail_create(&self, fail: bool) {
        self.lock_mut(|inner| inner.fail_create = fail);
    }

    /// Make the next `delete` calls fail as unavailable.
    pub fn set_fail_delete(&self, fail: bool) {
        self.lock_mut(|inner| inner.fail_delete = fail);
    }

    /// Number of stored accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock(|inner| inner.accounts.len())
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an account with the given id exists.
    #[must_use]
    pub fn contains(&self, id: AccountId) -> bool {
        self.lock(|inner| inner.accounts.contains_key(&id))
    }

    /// Look up an account by email.
    #[must_use]
    pub fn find_by_email(&self, email: &str) -> Option<Account> {
        self.lock(|inner| {
            inner
                .accounts
                .values()
                .find(|(account, _)| account.email.as_str() == email)
                .map(|(account, _)| account.clone())
        })
    }

    fn lock<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }

    fn lock_mut<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, new: NewAccount) -> Result<Account, RepositoryError> {
        self.lock_mut(|inner| {
            if inner.fail_create {
                return Err(RepositoryError::Unavailable("injected failure".to_owned()));
            }

            for (account, _) in inner.accounts.values() {
                if account.email == new.email {
                    return Err(RepositoryError::Conflict("email".to_owned()));
                }
                if account.phone == new.phone {
                    return Err(RepositoryError::Conflict("phone".to_owned()));
                }
            }

            let account = Account {
                id: AccountId::new(Uuid::new_v4()),
                email: new.email,
                phone: new.phone,
                first_name: new.first_name,
                last_name: new.last_name,
                role: AccountRole::default(),
                status: AccountStatus::default(),
                created_at: Utc::now(),
            };
            inner
                .accounts
                .insert(account.id, (account.clone(), new.password_hash));
            Ok(account)
        })
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        self.lock_mut(|inner| {
            if inner.fail_delete {
                return Err(RepositoryError::Unavailable("injected failure".to_owned()));
            }
            // Removing a missing id is a success: idempotent compensation.
            inner.accounts.remove(&id);
            Ok(())
        })
    }

    async fn find_for_login(
        &self,
        email: Option<&Email>,
        phone: Option<&Phone>,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        Ok(self.lock(|inner| {
            inner
                .accounts
                .values()
                .find(|(account, _)| {
                    email.is_some_and(|e| &account.email == e)
                        || phone.is_some_and(|p| &account.phone == p)
                })
                .map(|(account, hash)| (account.clone(), hash.clone()))
        }))
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.lock(|inner| inner.accounts.get(&id).map(|(account, _)| account.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str, phone: &str) -> NewAccount {
        NewAccount {
            email: Email::parse(email).unwrap(),
            phone: Phone::parse(phone).unwrap(),
            password_hash: "$argon2id$stub".to_owned(),
            first_name: "Test".to_owned(),
            last_name: "Shopper".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let store = InMemoryAccountStore::new();
        let account = store
            .create(new_account("a@b.com", "+905551234567"))
            .await
            .unwrap();

        assert!(store.contains(account.id));
        let (found, hash) = store
            .find_for_login(Some(&account.email), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, account.id);
        assert_eq!(hash, "$argon2id$stub");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = InMemoryAccountStore::new();
        store
            .create(new_account("a@b.com", "+905551234567"))
            .await
            .unwrap();

        let err = store
            .create(new_account("a@b.com", "+905557654321"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(field) if field == "email"));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryAccountStore::new();
        let account = store
            .create(new_account("a@b.com", "+905551234567"))
            .await
            .unwrap();

        store.delete(account.id).await.unwrap();
        // Second delete of the same id must also succeed.
        store.delete(account.id).await.unwrap();
        assert!(store.is_empty());
    }
}
