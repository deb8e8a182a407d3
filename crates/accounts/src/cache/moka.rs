//! Moka-backed token cache.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{Expiry, future::Cache};

use bazaar_core::AccountId;

use super::{TokenCache, TokenCacheError, access_key, refresh_key};
use crate::issuer::{ACCESS_TOKEN_TTL, REFRESH_TOKEN_TTL};
use crate::models::TokenPair;

const MAX_ENTRIES: u64 = 100_000;

/// A cached token with its own lifetime.
#[derive(Debug, Clone)]
struct Entry {
    token: String,
    ttl: Duration,
}

/// Per-entry expiry: each key lives exactly as long as its token.
struct PerEntryExpiry;

impl Expiry<String, Entry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process token cache over [`moka::future::Cache`].
///
/// Access and refresh keys expire independently; the pair insert cannot
/// partially fail in-process, which satisfies the both-or-neither contract.
#[derive(Clone)]
pub struct MokaTokenCache {
    cache: Cache<String, Entry>,
}

impl Default for MokaTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MokaTokenCache {
    /// Create a new token cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .expire_after(PerEntryExpiry)
                .build(),
        }
    }

    /// Read a raw cache entry. Used by tests and diagnostics.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await.map(|entry| entry.token)
    }
}

#[async_trait]
impl TokenCache for MokaTokenCache {
    async fn put_tokens(
        &self,
        account_id: AccountId,
        tokens: &TokenPair,
    ) -> Result<(), TokenCacheError> {
        self.cache
            .insert(
                access_key(account_id),
                Entry {
                    token: tokens.access_token.clone(),
                    ttl: ACCESS_TOKEN_TTL,
                },
            )
            .await;
        self.cache
            .insert(
                refresh_key(account_id),
                Entry {
                    token: tokens.refresh_token.clone(),
                    ttl: REFRESH_TOKEN_TTL,
                },
            )
            .await;
        Ok(())
    }

    async fn remove_tokens(&self, account_id: AccountId) -> Result<(), TokenCacheError> {
        self.cache.invalidate(&access_key(account_id)).await;
        self.cache.invalidate(&refresh_key(account_id)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "access-jwt".to_owned(),
            refresh_token: "refresh-jwt".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_put_sets_both_keys() {
        let cache = MokaTokenCache::new();
        let id = AccountId::new(Uuid::new_v4());

        cache.put_tokens(id, &pair()).await.unwrap();

        assert_eq!(cache.get(&access_key(id)).await.as_deref(), Some("access-jwt"));
        assert_eq!(
            cache.get(&refresh_key(id)).await.as_deref(),
            Some("refresh-jwt")
        );
    }

    #[tokio::test]
    async fn test_remove_clears_both_keys() {
        let cache = MokaTokenCache::new();
        let id = AccountId::new(Uuid::new_v4());

        cache.put_tokens(id, &pair()).await.unwrap();
        cache.remove_tokens(id).await.unwrap();

        assert!(cache.get(&access_key(id)).await.is_none());
        assert!(cache.get(&refresh_key(id)).await.is_none());
    }

    #[tokio::test]
    async fn test_accounts_do_not_collide() {
        let cache = MokaTokenCache::new();
        let a = AccountId::new(Uuid::new_v4());
        let b = AccountId::new(Uuid::new_v4());

        cache.put_tokens(a, &pair()).await.unwrap();
        assert!(cache.get(&access_key(b)).await.is_none());
    }
}
