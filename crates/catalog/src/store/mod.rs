//! Catalog persistence.
//!
//! The engine talks to the primary store through the [`CatalogStore`]
//! trait. The Postgres implementation owns the real rows and provides the
//! multi-statement atomic transactions the engine's contract requires; the
//! in-memory implementation backs tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bazaar_core::{ProductId, VariantId};

use crate::models::{NewProduct, NewVariant, Product, ProductPatch, Variant};

pub use memory::InMemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Errors from the catalog store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated; the payload names the field.
    #[error("unique constraint violated on {0}")]
    Conflict(String),

    /// Referenced record does not exist.
    #[error("record not found")]
    NotFound,

    /// A stored value failed to decode into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store is unreachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for products and variants.
///
/// Every mutating method is atomic at the store level: it either applies
/// all of its statements or none of them.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a product with nested variants and tag links in one
    /// transaction. Variant status is derived from stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("slug")` when the slug is taken,
    /// `RepositoryError::NotFound` when a referenced brand/category/tag is
    /// missing.
    async fn insert_product(
        &self,
        slug: &str,
        spec: &NewProduct,
    ) -> Result<Product, RepositoryError>;

    /// Apply a partial update in one transaction: patch product fields,
    /// replace tags wholesale if provided, patch referenced variants by id
    /// (unknown ids are silently skipped), re-deriving variant status from
    /// stock unless an explicit status is supplied.
    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError>;

    /// Insert variants for an existing product. Returns the parent (with
    /// its relations, as needed for projection) and the new variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the product is missing.
    async fn insert_variants(
        &self,
        product_id: ProductId,
        specs: &[NewVariant],
    ) -> Result<(Product, Vec<Variant>), RepositoryError>;

    /// Get a product with all relations, or `None`.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Get a product by slug, or `None`.
    async fn get_product_by_slug(&self, slug: &str)
    -> Result<Option<Product>, RepositoryError>;

    /// Get a product with only its ACTIVE variants, newest first.
    async fn get_product_with_active_variants(
        &self,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Soft-delete a product (status flip + timestamp); with `cascade`,
    /// soft-delete all of its variants in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the product is missing.
    async fn soft_delete_product(
        &self,
        id: ProductId,
        cascade: bool,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Soft-delete exactly the given variants of a product. Returns the
    /// number of rows touched; matching nothing is the caller's concern.
    async fn soft_delete_variants(
        &self,
        product_id: ProductId,
        variant_ids: &[VariantId],
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
}
