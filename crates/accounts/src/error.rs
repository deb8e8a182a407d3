//! Authentication error types.

use thiserror::Error;

use bazaar_core::ValidationError;

use crate::cache::TokenCacheError;
use crate::issuer::IssuerError;
use crate::store::RepositoryError;

/// Errors that can occur during account provisioning operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Caller input failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email or phone already exists.
    #[error("an account with this email or phone already exists")]
    DuplicateAccount,

    /// Token signing failed. Terminal; nothing was persisted to the cache.
    #[error("token issuance failed")]
    TokenIssuance(#[source] IssuerError),

    /// Token persistence failed after the account was created. The account
    /// has been rolled back; the underlying cache failure is intentionally
    /// not exposed.
    #[error("transaction aborted")]
    TransactionAborted(#[source] TokenCacheError),

    /// Account store error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_aborted_hides_cause() {
        let err = AuthError::TransactionAborted(TokenCacheError::Unavailable(
            "connection refused".to_owned(),
        ));
        // The client-facing message must not leak cache internals.
        assert_eq!(err.to_string(), "transaction aborted");
    }
}
