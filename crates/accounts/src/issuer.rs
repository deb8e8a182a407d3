//! Credential issuer: dual-secret JWT signing.
//!
//! A token pair is two independently signed claims blobs, a short-lived
//! access token and a long-lived refresh token, signed with distinct
//! secrets. If either signature fails the whole issuance fails; a partial
//! pair never escapes.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use bazaar_core::{AccountId, AccountRole, AccountStatus, Email};

use crate::models::{AccountClaims, TokenPair};

/// Access token lifetime.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime.
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors from signing or verifying tokens.
#[derive(Debug, Error)]
pub enum IssuerError {
    /// Signing failed (bad key material, serialization failure).
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Verification failed (bad signature, expired, malformed).
    #[error("token verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),

    /// The claims payload decoded but carries invalid values.
    #[error("token claims invalid: {0}")]
    InvalidClaims(String),
}

/// Wire form of the claims payload.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    sub: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    role: AccountRole,
    status: AccountStatus,
    iat: i64,
    exp: i64,
}

impl JwtClaims {
    fn from_claims(claims: &AccountClaims, iat: i64, ttl: Duration) -> Self {
        #[allow(clippy::cast_possible_wrap)] // TTLs are small constants
        let exp = iat + ttl.as_secs() as i64;
        Self {
            sub: claims.id.as_uuid(),
            email: claims.email.to_string(),
            first_name: claims.first_name.clone(),
            last_name: claims.last_name.clone(),
            role: claims.role,
            status: claims.status,
            iat,
            exp,
        }
    }

    fn into_claims(self) -> Result<AccountClaims, IssuerError> {
        let email = Email::parse(&self.email)
            .map_err(|e| IssuerError::InvalidClaims(format!("email: {e}")))?;
        Ok(AccountClaims {
            id: AccountId::new(self.sub),
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            status: self.status,
        })
    }
}

/// Signs access/refresh token pairs and verifies refresh tokens.
///
/// Holds the two signing secrets for the lifetime of the process; both must
/// be present at construction or signing cannot happen at all.
pub struct CredentialIssuer {
    access_secret: SecretString,
    refresh_secret: SecretString,
}

impl CredentialIssuer {
    /// Create an issuer from the two signing secrets.
    #[must_use]
    pub const fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
        }
    }

    /// Sign an access/refresh pair from the same claims payload.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::Signing` if either signature fails; no partial
    /// pair is returned.
    pub fn issue(&self, claims: &AccountClaims) -> Result<TokenPair, IssuerError> {
        let iat = Utc::now().timestamp();

        let access_token = sign(&self.access_secret, claims, iat, ACCESS_TOKEN_TTL)?;
        let refresh_token = sign(&self.refresh_secret, claims, iat, REFRESH_TOKEN_TTL)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify a refresh token and recover the claims it carries.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError::Verification` for bad signatures, expiry, or
    /// malformed tokens.
    pub fn verify_refresh(&self, token: &str) -> Result<AccountClaims, IssuerError> {
        let key = DecodingKey::from_secret(self.refresh_secret.expose_secret().as_bytes());
        let data = decode::<JwtClaims>(token, &key, &Validation::default())
            .map_err(IssuerError::Verification)?;
        data.claims.into_claims()
    }
}

fn sign(
    secret: &SecretString,
    claims: &AccountClaims,
    iat: i64,
    ttl: Duration,
) -> Result<String, IssuerError> {
    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    encode(
        &Header::default(),
        &JwtClaims::from_claims(claims, iat, ttl),
        &key,
    )
    .map_err(IssuerError::Signing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> CredentialIssuer {
        CredentialIssuer::new(
            SecretString::from("access-secret-for-tests-0123456789"),
            SecretString::from("refresh-secret-for-tests-987654321"),
        )
    }

    fn claims() -> AccountClaims {
        AccountClaims {
            id: AccountId::new(Uuid::new_v4()),
            email: Email::parse("a@b.com").unwrap(),
            first_name: "Arda".to_owned(),
            last_name: "Tas".to_owned(),
            role: AccountRole::User,
            status: AccountStatus::Active,
        }
    }

    #[test]
    fn test_issue_produces_distinct_tokens() {
        let pair = issuer().issue(&claims()).unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_refresh_round_trip() {
        let issuer = issuer();
        let original = claims();
        let pair = issuer.issue(&original).unwrap();

        let recovered = issuer.verify_refresh(&pair.refresh_token).unwrap();
        assert_eq!(recovered.id, original.id);
        assert_eq!(recovered.email, original.email);
        assert_eq!(recovered.role, original.role);
    }

    #[test]
    fn test_access_token_does_not_verify_as_refresh() {
        let issuer = issuer();
        let pair = issuer.issue(&claims()).unwrap();

        // Signed with the access secret, so the refresh secret must reject it.
        let err = issuer.verify_refresh(&pair.access_token).unwrap_err();
        assert!(matches!(err, IssuerError::Verification(_)));
    }

    #[test]
    fn test_expired_refresh_token_rejected() {
        let issuer = issuer();
        let original = claims();

        // Hand-craft a token whose expiry is well past the default leeway.
        let iat = Utc::now().timestamp() - 600;
        let stale = JwtClaims {
            exp: iat + 1,
            ..JwtClaims::from_claims(&original, iat, Duration::from_secs(1))
        };
        let key = EncodingKey::from_secret(
            issuer.refresh_secret.expose_secret().as_bytes(),
        );
        let token = encode(&Header::default(), &stale, &key).unwrap();

        let err = issuer.verify_refresh(&token).unwrap_err();
        assert!(matches!(err, IssuerError::Verification(_)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = issuer();
        let pair = issuer.issue(&claims()).unwrap();
        let tampered = format!("{}x", pair.refresh_token);

        assert!(issuer.verify_refresh(&tampered).is_err());
    }
}
