//! Authentication route handlers: register, login, token refresh.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};

use bazaar_accounts::models::{Account, AccountClaims, LoginInput, RegisterInput, TokenPair};

use crate::error::Result;
use crate::state::AppState;

/// Auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

/// Successful register/login response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub account: Account,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    fn new(account: Account, tokens: TokenPair) -> Self {
        Self {
            account,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Successful refresh response.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub account: AccountClaims,
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh request payload.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (account, tokens) = state.saga().register(input).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::new(account, tokens))))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<AuthResponse>> {
    let (account, tokens) = state.saga().login(input).await?;
    Ok(Json(AuthResponse::new(account, tokens)))
}

async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let (claims, tokens) = state.saga().refresh(&request.refresh_token).await?;
    Ok(Json(RefreshResponse {
        account: claims,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}
