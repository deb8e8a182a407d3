//! HTTP route handlers.
//!
//! Handlers are thin: decode the payload, call the saga or the engine,
//! encode the result. All domain decisions live below this layer.

pub mod auth;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// All API routes.
pub fn routes() -> Router<AppState> {
    Router::new().merge(auth::routes()).merge(products::routes())
}
