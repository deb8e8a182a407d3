//! Account provisioning saga.
//!
//! Registration spans the account store and the token cache without a shared
//! transaction:
//!
//! 1. create the account row,
//! 2. issue the token pair,
//! 3. persist the pair into the token cache.
//!
//! A failure in step 3 triggers compensation: a best-effort, fire-and-forget
//! deletion of the account created in step 1. The deletion is idempotent, so
//! a duplicate rollback signal is harmless. The saga is in-memory and
//! single-attempt; no durable saga log is kept.
//!
//! Login and refresh reuse steps 2 and 3 without step 1 and carry no
//! compensation, since nothing new was created.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use bazaar_core::AccountId;

use crate::cache::TokenCache;
use crate::error::AuthError;
use crate::issuer::CredentialIssuer;
use crate::models::{
    Account, AccountClaims, LoginInput, NewAccount, RegisterInput, TokenPair,
    validate_login, validate_registration,
};
use crate::store::{AccountStore, RepositoryError};

/// Progress of one register call. Never persisted; transitions are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    Started,
    AccountCreated,
    TokensIssued,
    TokensPersisted,
    Compensating,
    Failed,
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Started => "STARTED",
            Self::AccountCreated => "ACCOUNT_CREATED",
            Self::TokensIssued => "TOKENS_ISSUED",
            Self::TokensPersisted => "TOKENS_PERSISTED",
            Self::Compensating => "COMPENSATING",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Orchestrates register, login, and token refresh.
pub struct ProvisioningSaga<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    issuer: CredentialIssuer,
}

impl<S, C> ProvisioningSaga<S, C>
where
    S: AccountStore + 'static,
    C: TokenCache,
{
    /// Create a new saga over its collaborators.
    pub const fn new(store: Arc<S>, cache: Arc<C>, issuer: CredentialIssuer) -> Self {
        Self {
            store,
            cache,
            issuer,
        }
    }

    /// Register a new account: create → issue tokens → persist tokens.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` for malformed input (nothing attempted).
    /// - `AuthError::DuplicateAccount` on a unique-constraint hit (nothing
    ///   to undo).
    /// - `AuthError::TokenIssuance` if signing fails (the account exists;
    ///   signing has no external side effect, so no compensation runs).
    /// - `AuthError::TransactionAborted` if the cache write fails; the
    ///   account rollback has been dispatched before this returns.
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(
        &self,
        input: RegisterInput,
    ) -> Result<(Account, TokenPair), AuthError> {
        let (email, phone) = validate_registration(&input)?;
        let password_hash = hash_password(&input.password)?;

        let mut state = ProvisioningState::Started;

        let account = self
            .store
            .create(NewAccount {
                email,
                phone,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateAccount,
                other => AuthError::Repository(other),
            })?;
        transition(&mut state, ProvisioningState::AccountCreated);

        let claims = AccountClaims::from(&account);
        let tokens = self.issuer.issue(&claims).map_err(AuthError::TokenIssuance)?;
        transition(&mut state, ProvisioningState::TokensIssued);

        if let Err(cache_err) = self.cache.put_tokens(account.id, &tokens).await {
            transition(&mut state, ProvisioningState::Compensating);
            tracing::warn!(
                account_id = %account.id,
                error = %cache_err,
                "token persistence failed, rolling back account"
            );
            self.spawn_compensation(account.id);
            transition(&mut state, ProvisioningState::Failed);
            return Err(AuthError::TransactionAborted(cache_err));
        }
        transition(&mut state, ProvisioningState::TokensPersisted);

        Ok((account, tokens))
    }

    /// Verify credentials and issue a fresh token pair.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidCredentials` for an unknown account or a password
    /// mismatch; `AuthError::TransactionAborted` if the cache write fails
    /// (no compensation, since nothing was created).
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, input: LoginInput) -> Result<(Account, TokenPair), AuthError> {
        let (email, phone) = validate_login(&input)?;

        let (account, password_hash) = self
            .store
            .find_for_login(email.as_ref(), phone.as_ref())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&input.password, &password_hash)?;

        let claims = AccountClaims::from(&account);
        let tokens = self.issuer.issue(&claims).map_err(AuthError::TokenIssuance)?;

        self.cache
            .put_tokens(account.id, &tokens)
            .await
            .map_err(AuthError::TransactionAborted)?;

        Ok((account, tokens))
    }

    /// Exchange a refresh token for a fresh pair.
    ///
    /// # Errors
    ///
    /// `AuthError::InvalidCredentials` if the refresh token fails
    /// verification; `AuthError::TransactionAborted` if the cache write
    /// fails.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<(AccountClaims, TokenPair), AuthError> {
        let claims = self
            .issuer
            .verify_refresh(refresh_token)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let tokens = self.issuer.issue(&claims).map_err(AuthError::TokenIssuance)?;

        self.cache
            .put_tokens(claims.id, &tokens)
            .await
            .map_err(AuthError::TransactionAborted)?;

        Ok((claims, tokens))
    }

    /// Dispatch the compensating account deletion.
    ///
    /// Fire-and-forget: the task is spawned before the caller observes the
    /// error, but never awaited. A failed rollback is logged and left to
    /// reconciliation; the deletion itself is idempotent.
    fn spawn_compensation(&self, account_id: AccountId) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.delete(account_id).await {
                Ok(()) => {
                    tracing::info!(%account_id, "account rolled back after token persistence failure");
                }
                Err(e) => {
                    tracing::error!(
                        %account_id,
                        error = %e,
                        "account rollback failed, leaving cleanup to reconciliation"
                    );
                }
            }
        });
    }
}

fn transition(state: &mut ProvisioningState, to: ProvisioningState) {
    tracing::debug!(from = %state, to = %to, "provisioning transition");
    *state = to;
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_matches_wire_names() {
        assert_eq!(ProvisioningState::Started.to_string(), "STARTED");
        assert_eq!(
            ProvisioningState::AccountCreated.to_string(),
            "ACCOUNT_CREATED"
        );
        assert_eq!(ProvisioningState::TokensIssued.to_string(), "TOKENS_ISSUED");
        assert_eq!(
            ProvisioningState::TokensPersisted.to_string(),
            "TOKENS_PERSISTED"
        );
        assert_eq!(ProvisioningState::Compensating.to_string(), "COMPENSATING");
        assert_eq!(ProvisioningState::Failed.to_string(), "FAILED");
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(verify_password("correct-horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("correct-horse").unwrap();
        let b = hash_password("correct-horse").unwrap();
        assert_ne!(a, b);
    }
}
