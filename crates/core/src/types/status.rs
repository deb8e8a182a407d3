//! Status enums for products, variants, and accounts.

use serde::{Deserialize, Serialize};

/// Lifecycle status shared by products and variants.
///
/// Deletions in the catalog are always soft: rows flip to `Deleted` and keep
/// their data, and the search index is updated to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Archived,
    Deleted,
}

impl ProductStatus {
    /// String form as stored in the database and the search index.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Archived => "ARCHIVED",
            Self::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "ARCHIVED" => Ok(Self::Archived),
            "DELETED" => Ok(Self::Deleted),
            _ => Err(format!("invalid product status: {s}")),
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Regular shopper account.
    #[default]
    User,
    /// Store administrator.
    Admin,
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid account role: {s}")),
        }
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Closed,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(format!("invalid account status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_product_status_round_trip() {
        for status in [
            ProductStatus::Active,
            ProductStatus::Inactive,
            ProductStatus::Archived,
            ProductStatus::Deleted,
        ] {
            assert_eq!(ProductStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_product_status_serde_screaming() {
        let json = serde_json::to_string(&ProductStatus::Deleted).unwrap();
        assert_eq!(json, "\"DELETED\"");
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!(AccountRole::from_str("user").unwrap(), AccountRole::User);
        assert_eq!(AccountRole::from_str("admin").unwrap(), AccountRole::Admin);
        assert!(AccountRole::from_str("root").is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ProductStatus::default(), ProductStatus::Active);
        assert_eq!(AccountRole::default(), AccountRole::User);
        assert_eq!(AccountStatus::default(), AccountStatus::Active);
    }
}
