//! Token cache.
//!
//! Issued token pairs are persisted under two independently expiring keys,
//! `access:{account_id}` and `refresh:{account_id}`. The put is
//! both-or-neither: a caller never observes a pair with only one half set.

pub mod moka;

use async_trait::async_trait;
use thiserror::Error;

use bazaar_core::AccountId;

use crate::models::TokenPair;

pub use self::moka::MokaTokenCache;

/// Errors from the token cache.
#[derive(Debug, Error)]
pub enum TokenCacheError {
    /// The cache could not be reached or refused the write.
    #[error("token cache unavailable: {0}")]
    Unavailable(String),
}

/// Key under which an account's access token is stored.
#[must_use]
pub fn access_key(account_id: AccountId) -> String {
    format!("access:{account_id}")
}

/// Key under which an account's refresh token is stored.
#[must_use]
pub fn refresh_key(account_id: AccountId) -> String {
    format!("refresh:{account_id}")
}

/// Expiring key-value storage for issued token pairs.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Persist both tokens of a pair with their respective lifetimes.
    ///
    /// Multi-key atomicity: either both keys are set or neither is.
    async fn put_tokens(
        &self,
        account_id: AccountId,
        tokens: &TokenPair,
    ) -> Result<(), TokenCacheError>;

    /// Remove both tokens for an account (logout / revocation).
    async fn remove_tokens(&self, account_id: AccountId) -> Result<(), TokenCacheError>;
}
