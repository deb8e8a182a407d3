//! Product route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use bazaar_catalog::engine::{StatusChange, StatusScope};
use bazaar_catalog::models::{
    BulkResult, NewProduct, NewVariant, Product, ProductPatch, ResultPage, SearchCriteria,
};
use bazaar_core::{ProductId, ProductStatus, VariantId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Product routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/search", post(search))
        .route(
            "/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/products/{id}/variants", post(create_variants))
        .route("/products/{id}/active", get(get_active_variants))
        .route("/products/{id}/status", post(change_status))
        .route("/products/slug/{slug}", get(get_by_slug))
}

async fn create_product(
    State(state): State<AppState>,
    Json(spec): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog().create_product(spec).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>> {
    let product = state.catalog().get_product(ProductId::new(id)).await?;
    Ok(Json(product))
}

async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    let product = state.catalog().get_by_slug(&slug).await?;
    Ok(Json(product))
}

async fn get_active_variants(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>> {
    let product = state
        .catalog()
        .get_active_variants(ProductId::new(id))
        .await?;
    Ok(Json(product))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    let product = state
        .catalog()
        .update_product(ProductId::new(id), patch)
        .await?;
    Ok(Json(product))
}

async fn create_variants(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(specs): Json<Vec<NewVariant>>,
) -> Result<(StatusCode, Json<BulkResult>)> {
    let result = state
        .catalog()
        .create_variants(ProductId::new(id), specs)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Query parameters for product deletion.
#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    /// Comma-separated variant ids for a selective variant soft-delete.
    #[serde(default)]
    pub variant_ids: Option<String>,
    /// Cascade: soft-delete the product and all of its variants.
    #[serde(default)]
    pub all: bool,
}

async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<serde_json::Value>> {
    let variant_ids = params
        .variant_ids
        .as_deref()
        .map(parse_id_list)
        .transpose()?;

    let deleted = state
        .catalog()
        .delete_product(ProductId::new(id), variant_ids, params.all)
        .await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// Status change request payload; the product id comes from the path.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: ProductStatus,
    pub scope: StatusScope,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default)]
    pub variant_ids: Option<Vec<VariantId>>,
}

/// Status change acknowledgement.
#[derive(Debug, Serialize)]
pub struct ChangeStatusResponse {
    pub updated: bool,
}

async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<ChangeStatusResponse>> {
    state
        .catalog()
        .change_status(StatusChange {
            product_id: ProductId::new(id),
            status: request.status,
            scope: request.scope,
            variant_id: request.variant_id,
            variant_ids: request.variant_ids,
        })
        .await?;
    Ok(Json(ChangeStatusResponse { updated: true }))
}

async fn search(
    State(state): State<AppState>,
    Json(criteria): Json<SearchCriteria>,
) -> Result<Json<ResultPage>> {
    let page = state.catalog().search(criteria).await?;
    Ok(Json(page))
}

fn parse_id_list(raw: &str) -> Result<Vec<VariantId>> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            part.trim()
                .parse::<i32>()
                .map(VariantId::new)
                .map_err(|_| AppError::BadRequest(format!("invalid variant id: {part}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        let ids = parse_id_list("1, 2,3").unwrap();
        assert_eq!(ids, vec![VariantId::new(1), VariantId::new(2), VariantId::new(3)]);
    }

    #[test]
    fn test_parse_id_list_rejects_garbage() {
        assert!(parse_id_list("1,x").is_err());
    }

    #[test]
    fn test_parse_id_list_ignores_empty_segments() {
        let ids = parse_id_list("1,,2,").unwrap();
        assert_eq!(ids.len(), 2);
    }
}
