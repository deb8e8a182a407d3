//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-class errors to
//! Sentry before responding to the client. All route handlers should return
//! `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use bazaar_accounts::AuthError;
use bazaar_catalog::CatalogError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Account provisioning failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Auth(err) => matches!(
                err,
                AuthError::Repository(_)
                    | AuthError::TransactionAborted(_)
                    | AuthError::TokenIssuance(_)
                    | AuthError::PasswordHash
            ),
            Self::Catalog(err) => {
                matches!(err, CatalogError::Repository(_) | CatalogError::Search(_))
            }
            Self::Internal(_) => true,
            Self::BadRequest(_) => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::DuplicateAccount => StatusCode::CONFLICT,
                AuthError::TokenIssuance(_)
                | AuthError::TransactionAborted(_)
                | AuthError::Repository(_)
                | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(_) | CatalogError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
                CatalogError::Conflict(_) | CatalogError::SlugGenerationExhausted => {
                    StatusCode::CONFLICT
                }
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Search(_) => StatusCode::BAD_GATEWAY,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Never exposes store or cache internals.
    fn message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::Validation(v) => v.to_string(),
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::DuplicateAccount => {
                    "An account with this email or phone already exists".to_string()
                }
                // The cause stays server-side by design.
                AuthError::TransactionAborted(_) => "Transaction aborted".to_string(),
                AuthError::TokenIssuance(_)
                | AuthError::Repository(_)
                | AuthError::PasswordHash => "Internal server error".to_string(),
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(v) => v.to_string(),
                CatalogError::InvalidRequest(msg) | CatalogError::NotFound(msg) => msg.clone(),
                CatalogError::Conflict(field) => {
                    format!("This record already exists ({field})")
                }
                CatalogError::SlugGenerationExhausted => {
                    "Slug could not be created or product could not be saved".to_string()
                }
                CatalogError::Search(_) => "Search service error".to_string(),
                CatalogError::Repository(_) => "Internal server error".to_string(),
            },
            Self::BadRequest(msg) => msg.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_auth_status_codes() {
        assert_eq!(
            status_of(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Auth(AuthError::DuplicateAccount)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_catalog_status_codes() {
        assert_eq!(
            status_of(AppError::Catalog(CatalogError::NotFound("x".to_owned()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Catalog(CatalogError::SlugGenerationExhausted)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::BadRequest("x".to_owned())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_transaction_aborted_message_is_generic() {
        let err = AppError::Auth(AuthError::TransactionAborted(
            bazaar_accounts::cache::TokenCacheError::Unavailable("redis down".to_owned()),
        ));
        assert_eq!(err.message(), "Transaction aborted");
    }
}
