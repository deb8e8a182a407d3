//! Account persistence.
//!
//! The saga talks to the account store through the [`AccountStore`] trait;
//! the Postgres implementation owns the real rows, the in-memory
//! implementation backs tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use bazaar_core::{AccountId, Email, Phone};

use crate::models::{Account, NewAccount};

pub use memory::InMemoryAccountStore;
pub use postgres::PgAccountStore;

/// Errors from the account store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated; the payload names the field.
    #[error("unique constraint violated on {0}")]
    Conflict(String),

    /// Referenced record does not exist.
    #[error("record not found")]
    NotFound,

    /// A stored value failed to decode into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create a new account row and return the stored account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` with the violated field name when
    /// the email or phone is already taken.
    async fn create(&self, new: NewAccount) -> Result<Account, RepositoryError>;

    /// Delete an account by id.
    ///
    /// Idempotent: deleting an id that does not exist (or was already
    /// deleted) is a success. The saga's compensation path relies on this.
    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError>;

    /// Look up an account by email or phone for credential verification.
    ///
    /// Returns the account together with its password hash, or `None` when
    /// no account matches either identifier.
    async fn find_for_login(
        &self,
        email: Option<&Email>,
        phone: Option<&Phone>,
    ) -> Result<Option<(Account, String)>, RepositoryError>;

    /// Get an account by id.
    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;
}
