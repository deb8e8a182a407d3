//! Postgres-backed catalog store.
//!
//! All multi-row mutations run inside a single transaction; the engine's
//! commit-before-projection ordering relies on that.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;

use bazaar_core::{BrandId, CategoryId, ProductId, ProductStatus, TagId, VariantId};

use super::{CatalogStore, RepositoryError};
use crate::models::{
    BrandRef, CategoryRef, NewProduct, NewVariant, Product, ProductImage, ProductPatch, TagRef,
    Variant, derived_status,
};

const PRODUCT_SELECT: &str = "SELECT p.id, p.title, p.slug, p.description, p.price, p.stock, \
     p.sku, p.status, p.images, p.created_at, p.deleted_at, \
     b.id AS brand_id, b.name AS brand_name, \
     c.id AS category_id, c.name AS category_name \
     FROM product p \
     LEFT JOIN brand b ON b.id = p.brand_id \
     LEFT JOIN category c ON c.id = p.category_id";

const VARIANT_COLUMNS: &str =
    "id, product_id, sku, price, stock, status, attributes, barcode, created_at, deleted_at";

/// Which variants to load alongside a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VariantScope {
    All,
    ActiveOnly,
}

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    title: String,
    slug: String,
    description: String,
    price: Decimal,
    stock: i32,
    sku: Option<String>,
    status: String,
    images: Value,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    brand_id: Option<i32>,
    brand_name: Option<String>,
    category_id: Option<i32>,
    category_name: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i32,
    product_id: i32,
    sku: String,
    price: Option<Decimal>,
    stock: i32,
    status: String,
    attributes: Value,
    barcode: Option<String>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct TagRow {
    id: i32,
    name: String,
}

impl TryFrom<VariantRow> for Variant {
    type Error = RepositoryError;

    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        let status = ProductStatus::from_str(&row.status)
            .map_err(RepositoryError::DataCorruption)?;
        let attributes: BTreeMap<String, Value> = serde_json::from_value(row.attributes)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid variant attributes: {e}"))
            })?;

        Ok(Self {
            id: VariantId::new(row.id),
            product_id: ProductId::new(row.product_id),
            sku: row.sku,
            price: row.price,
            stock: row.stock,
            status,
            attributes,
            barcode: row.barcode,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

impl ProductRow {
    fn assemble(self, variants: Vec<Variant>, tags: Vec<TagRef>) -> Result<Product, RepositoryError> {
        let status = ProductStatus::from_str(&self.status)
            .map_err(RepositoryError::DataCorruption)?;
        let images: Vec<ProductImage> = serde_json::from_value(self.images).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid product images: {e}"))
        })?;

        let brand = match (self.brand_id, self.brand_name) {
            (Some(id), Some(name)) => Some(BrandRef {
                id: BrandId::new(id),
                name,
            }),
            _ => None,
        };
        let category = match (self.category_id, self.category_name) {
            (Some(id), Some(name)) => Some(CategoryRef {
                id: CategoryId::new(id),
                name,
            }),
            _ => None,
        };

        Ok(Product {
            id: ProductId::new(self.id),
            title: self.title,
            slug: self.slug,
            description: self.description,
            price: self.price,
            stock: self.stock,
            sku: self.sku,
            status,
            images,
            brand,
            category,
            tags,
            variants,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a new catalog store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_product(
        &self,
        id: ProductId,
        scope: VariantScope,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };

        self.finish_load(row, scope).await.map(Some)
    }

    async fn load_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.slug = $1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };

        self.finish_load(row, VariantScope::All).await.map(Some)
    }

    async fn finish_load(
        &self,
        row: ProductRow,
        scope: VariantScope,
    ) -> Result<Product, RepositoryError> {
        let variant_sql = match scope {
            VariantScope::All => format!(
                "SELECT {VARIANT_COLUMNS} FROM product_variant \
                 WHERE product_id = $1 ORDER BY id"
            ),
            VariantScope::ActiveOnly => format!(
                "SELECT {VARIANT_COLUMNS} FROM product_variant \
                 WHERE product_id = $1 AND status = 'ACTIVE' ORDER BY created_at DESC"
            ),
        };
        let variant_rows: Vec<VariantRow> = sqlx::query_as(&variant_sql)
            .bind(row.id)
            .fetch_all(&self.pool)
            .await?;
        let variants = variant_rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;

        let tag_rows: Vec<TagRow> = sqlx::query_as(
            "SELECT t.id, t.name FROM product_tag pt \
             JOIN tag t ON t.id = pt.tag_id \
             WHERE pt.product_id = $1 ORDER BY t.id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;
        let tags = tag_rows
            .into_iter()
            .map(|t| TagRef {
                id: TagId::new(t.id),
                name: t.name,
            })
            .collect();

        row.assemble(variants, tags)
    }
}

/// Map an insert/update error, naming the violated unique field and turning
/// foreign-key misses into `NotFound`.
fn map_constraint_err(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            let field = db_err.constraint().map_or("record", |c| {
                if c.contains("slug") {
                    "slug"
                } else if c.contains("sku") {
                    "sku"
                } else if c.contains("barcode") {
                    "barcode"
                } else {
                    "record"
                }
            });
            return RepositoryError::Conflict(field.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Database(e)
}

fn attributes_json(attributes: &BTreeMap<String, Value>) -> Result<Value, RepositoryError> {
    serde_json::to_value(attributes)
        .map_err(|e| RepositoryError::DataCorruption(format!("unserializable attributes: {e}")))
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn insert_product(
        &self,
        slug: &str,
        spec: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let images = serde_json::to_value(&spec.images)
            .map_err(|e| RepositoryError::DataCorruption(format!("unserializable images: {e}")))?;

        let mut tx = self.pool.begin().await?;

        let product_id: i32 = sqlx::query_scalar(
            "INSERT INTO product \
             (title, slug, description, price, stock, sku, status, images, brand_id, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING id",
        )
        .bind(&spec.title)
        .bind(slug)
        .bind(&spec.description)
        .bind(spec.price)
        .bind(spec.stock)
        .bind(spec.sku.as_deref())
        .bind(ProductStatus::Active.as_str())
        .bind(images)
        .bind(spec.brand_id.map(|id| id.as_i32()))
        .bind(spec.category_id.map(|id| id.as_i32()))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_constraint_err)?;

        for variant in &spec.variants {
            sqlx::query(
                "INSERT INTO product_variant \
                 (product_id, sku, price, stock, status, attributes, barcode) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(product_id)
            .bind(&variant.sku)
            .bind(variant.price)
            .bind(variant.stock)
            .bind(derived_status(variant.stock).as_str())
            .bind(attributes_json(&variant.attributes)?)
            .bind(variant.barcode.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(map_constraint_err)?;
        }

        for tag_id in &spec.tag_ids {
            sqlx::query(
                "INSERT INTO product_tag (product_id, tag_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(product_id)
            .bind(tag_id.as_i32())
            .execute(&mut *tx)
            .await
            .map_err(map_constraint_err)?;
        }

        tx.commit().await?;

        self.load_product(ProductId::new(product_id), VariantScope::All)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        let images = patch
            .images
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("unserializable images: {e}")))?;

        let mut tx = self.pool.begin().await?;

        let existing_variant_ids: Vec<i32> =
            sqlx::query_scalar("SELECT id FROM product_variant WHERE product_id = $1")
                .bind(id.as_i32())
                .fetch_all(&mut *tx)
                .await?;

        let updated = sqlx::query(
            "UPDATE product SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             price = COALESCE($4, price), \
             stock = COALESCE($5, stock), \
             status = COALESCE($6, status), \
             images = COALESCE($7, images), \
             updated_at = now() \
             WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .bind(patch.stock)
        .bind(patch.status.map(ProductStatus::as_str))
        .bind(images)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        if let Some(tag_ids) = &patch.tag_ids {
            sqlx::query("DELETE FROM product_tag WHERE product_id = $1")
                .bind(id.as_i32())
                .execute(&mut *tx)
                .await?;
            for tag_id in tag_ids {
                sqlx::query(
                    "INSERT INTO product_tag (product_id, tag_id) VALUES ($1, $2) \
                     ON CONFLICT DO NOTHING",
                )
                .bind(id.as_i32())
                .bind(tag_id.as_i32())
                .execute(&mut *tx)
                .await
                .map_err(map_constraint_err)?;
            }
        }

        for variant_patch in &patch.variants {
            // Ids not on this product are silently skipped.
            if !existing_variant_ids.contains(&variant_patch.id.as_i32()) {
                continue;
            }

            let status = variant_patch
                .status
                .map(ProductStatus::as_str)
                .or_else(|| variant_patch.stock.map(|stock| derived_status(stock).as_str()));
            let attributes = variant_patch
                .attributes
                .as_ref()
                .map(|attrs| attributes_json(attrs))
                .transpose()?;

            sqlx::query(
                "UPDATE product_variant SET \
                 sku = COALESCE($2, sku), \
                 price = COALESCE($3, price), \
                 stock = COALESCE($4, stock), \
                 status = COALESCE($5, status), \
                 attributes = COALESCE($6, attributes), \
                 barcode = COALESCE($7, barcode) \
                 WHERE id = $1",
            )
            .bind(variant_patch.id.as_i32())
            .bind(variant_patch.sku.as_deref())
            .bind(variant_patch.price)
            .bind(variant_patch.stock)
            .bind(status)
            .bind(attributes)
            .bind(variant_patch.barcode.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(map_constraint_err)?;
        }

        tx.commit().await?;

        self.load_product(id, VariantScope::All)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn insert_variants(
        &self,
        product_id: ProductId,
        specs: &[NewVariant],
    ) -> Result<(Product, Vec<Variant>), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM product WHERE id = $1")
            .bind(product_id.as_i32())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let mut inserted = Vec::with_capacity(specs.len());
        let insert_sql = format!(
            "INSERT INTO product_variant \
             (product_id, sku, price, stock, status, attributes, barcode) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {VARIANT_COLUMNS}"
        );
        for spec in specs {
            let row: VariantRow = sqlx::query_as(&insert_sql)
                .bind(product_id.as_i32())
                .bind(&spec.sku)
                .bind(spec.price)
                .bind(spec.stock)
                .bind(derived_status(spec.stock).as_str())
                .bind(attributes_json(&spec.attributes)?)
                .bind(spec.barcode.as_deref())
                .fetch_one(&mut *tx)
                .await
                .map_err(map_constraint_err)?;
            inserted.push(Variant::try_from(row)?);
        }

        tx.commit().await?;

        let product = self
            .load_product(product_id, VariantScope::All)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        Ok((product, inserted))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.load_product(id, VariantScope::All).await
    }

    async fn get_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        self.load_product_by_slug(slug).await
    }

    async fn get_product_with_active_variants(
        &self,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        self.load_product(id, VariantScope::ActiveOnly).await
    }

    async fn soft_delete_product(
        &self,
        id: ProductId,
        cascade: bool,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE product SET status = 'DELETED', deleted_at = $2, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id.as_i32())
        .bind(deleted_at)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        if cascade {
            sqlx::query(
                "UPDATE product_variant SET status = 'DELETED', deleted_at = $2 \
                 WHERE product_id = $1",
            )
            .bind(id.as_i32())
            .bind(deleted_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn soft_delete_variants(
        &self,
        product_id: ProductId,
        variant_ids: &[VariantId],
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let ids: Vec<i32> = variant_ids.iter().map(VariantId::as_i32).collect();

        let result = sqlx::query(
            "UPDATE product_variant SET status = 'DELETED', deleted_at = $3 \
             WHERE product_id = $1 AND id = ANY($2)",
        )
        .bind(product_id.as_i32())
        .bind(&ids)
        .bind(deleted_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
