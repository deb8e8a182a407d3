//! Postgres-backed account store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use bazaar_core::{AccountId, AccountRole, AccountStatus, Email, Phone};

use super::{AccountStore, RepositoryError};
use crate::models::{Account, NewAccount};

const ACCOUNT_COLUMNS: &str =
    "id, email, phone, first_name, last_name, role, status, created_at";

/// Internal row type for account queries.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    phone: String,
    first_name: String,
    last_name: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;
        let role = AccountRole::from_str(&row.role)
            .map_err(RepositoryError::DataCorruption)?;
        let status = AccountStatus::from_str(&row.status)
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: AccountId::new(row.id),
            email,
            phone,
            first_name: row.first_name,
            last_name: row.last_name,
            role,
            status,
            created_at: row.created_at,
        })
    }
}

/// Internal row type carrying the password hash alongside the account.
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    id: Uuid,
    email: String,
    phone: String,
    first_name: String,
    last_name: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
    password_hash: String,
}

impl CredentialRow {
    fn split(self) -> Result<(Account, String), RepositoryError> {
        let hash = self.password_hash.clone();
        let account = AccountRow {
            id: self.id,
            email: self.email,
            phone: self.phone,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            status: self.status,
            created_at: self.created_at,
        }
        .try_into()?;
        Ok((account, hash))
    }
}

/// Repository for account database operations.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new account store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, new: NewAccount) -> Result<Account, RepositoryError> {
        let sql = format!(
            "INSERT INTO account (email, phone, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row: AccountRow = sqlx::query_as(&sql)
            .bind(new.email.as_str())
            .bind(new.phone.as_str())
            .bind(&new.password_hash)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    let field = db_err
                        .constraint()
                        .map_or("account", |c| {
                            if c.contains("email") {
                                "email"
                            } else if c.contains("phone") {
                                "phone"
                            } else {
                                "account"
                            }
                        });
                    return RepositoryError::Conflict(field.to_owned());
                }
                RepositoryError::Database(e)
            })?;

        row.try_into()
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        // Zero rows affected is fine: compensation may race a previous
        // delivery of the same rollback signal.
        sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_for_login(
        &self,
        email: Option<&Email>,
        phone: Option<&Phone>,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS}, password_hash FROM account \
             WHERE ($1::text IS NOT NULL AND email = $1) \
                OR ($2::text IS NOT NULL AND phone = $2)"
        );
        let row: Option<CredentialRow> = sqlx::query_as(&sql)
            .bind(email.map(Email::as_str))
            .bind(phone.map(Phone::as_str))
            .fetch_optional(&self.pool)
            .await?;

        row.map(CredentialRow::split).transpose()
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1");
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }
}
