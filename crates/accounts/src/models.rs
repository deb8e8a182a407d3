//! Account domain types and input shapes.
//!
//! Input shapes are plain structs with explicit validation functions that
//! collect field-level violations; nothing here touches a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    AccountId, AccountRole, AccountStatus, Email, FieldViolation, Phone, ValidationError,
};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// An account (domain type).
///
/// The password hash never leaves the store layer; this type is safe to
/// serialize outward.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    /// Store-assigned unique ID.
    pub id: AccountId,
    /// Email address (unique).
    pub email: Email,
    /// Phone number (unique).
    pub phone: Phone,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Account role.
    pub role: AccountRole,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating an account row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: Email,
    pub phone: Phone,
    /// Argon2 hash, computed before the store is touched.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Public claims carried by both tokens of a pair.
#[derive(Debug, Clone, Serialize)]
pub struct AccountClaims {
    pub id: AccountId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: AccountRole,
    pub status: AccountStatus,
}

impl From<&Account> for AccountClaims {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            role: account.role,
            status: account.status,
        }
    }
}

/// A signed access/refresh token pair.
///
/// Derived state: regenerated on every register, login, and refresh, and
/// persisted only in the token cache under independently expiring keys.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Raw registration payload from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub phone: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Raw login payload from the client.
///
/// Either an email or a phone number identifies the account.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

/// Validate a registration payload.
///
/// # Errors
///
/// Returns every violation at once so the client can fix the whole form.
pub fn validate_registration(input: &RegisterInput) -> Result<(Email, Phone), ValidationError> {
    let mut violations = Vec::new();

    let email = match Email::parse(&input.email) {
        Ok(email) => Some(email),
        Err(e) => {
            violations.push(FieldViolation::new("email", e.to_string()));
            None
        }
    };

    let phone = match Phone::parse(&input.phone) {
        Ok(phone) => Some(phone),
        Err(e) => {
            violations.push(FieldViolation::new("phone", e.to_string()));
            None
        }
    };

    if input.password.len() < MIN_PASSWORD_LENGTH {
        violations.push(FieldViolation::new(
            "password",
            format!("must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }

    if input.first_name.trim().is_empty() {
        violations.push(FieldViolation::new("first_name", "cannot be empty"));
    }

    if input.last_name.trim().is_empty() {
        violations.push(FieldViolation::new("last_name", "cannot be empty"));
    }

    match (email, phone) {
        (Some(email), Some(phone)) if violations.is_empty() => Ok((email, phone)),
        _ => Err(ValidationError::new(violations)),
    }
}

/// Validate a login payload.
///
/// # Errors
///
/// Returns a violation list if neither identifier parses or the password is
/// empty.
pub fn validate_login(input: &LoginInput) -> Result<(Option<Email>, Option<Phone>), ValidationError> {
    let mut violations = Vec::new();

    let email = match input.email.as_deref() {
        Some(raw) => match Email::parse(raw) {
            Ok(email) => Some(email),
            Err(e) => {
                violations.push(FieldViolation::new("email", e.to_string()));
                None
            }
        },
        None => None,
    };

    let phone = match input.phone.as_deref() {
        Some(raw) => match Phone::parse(raw) {
            Ok(phone) => Some(phone),
            Err(e) => {
                violations.push(FieldViolation::new("phone", e.to_string()));
                None
            }
        },
        None => None,
    };

    if email.is_none() && phone.is_none() && violations.is_empty() {
        violations.push(FieldViolation::new(
            "email",
            "either email or phone is required",
        ));
    }

    if input.password.is_empty() {
        violations.push(FieldViolation::new("password", "cannot be empty"));
    }

    if violations.is_empty() {
        Ok((email, phone))
    } else {
        Err(ValidationError::new(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> RegisterInput {
        RegisterInput {
            email: "a@b.com".to_owned(),
            phone: "+905551234567".to_owned(),
            password: "correct-horse".to_owned(),
            first_name: "Arda".to_owned(),
            last_name: "Tas".to_owned(),
        }
    }

    #[test]
    fn test_validate_registration_ok() {
        let (email, phone) = validate_registration(&valid_input()).unwrap();
        assert_eq!(email.as_str(), "a@b.com");
        assert_eq!(phone.as_str(), "+905551234567");
    }

    #[test]
    fn test_validate_registration_collects_all_violations() {
        let input = RegisterInput {
            email: "broken".to_owned(),
            phone: "123".to_owned(),
            password: "short".to_owned(),
            first_name: " ".to_owned(),
            last_name: String::new(),
        };
        let err = validate_registration(&input).unwrap_err();
        let fields: Vec<_> = err.violations.iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            vec!["email", "phone", "password", "first_name", "last_name"]
        );
    }

    #[test]
    fn test_validate_login_requires_identifier() {
        let input = LoginInput {
            email: None,
            phone: None,
            password: "secret-enough".to_owned(),
        };
        let err = validate_login(&input).unwrap_err();
        assert_eq!(err.violations.len(), 1);
    }

    #[test]
    fn test_validate_login_accepts_phone_only() {
        let input = LoginInput {
            email: None,
            phone: Some("+905551234567".to_owned()),
            password: "secret-enough".to_owned(),
        };
        let (email, phone) = validate_login(&input).unwrap();
        assert!(email.is_none());
        assert!(phone.is_some());
    }
}
