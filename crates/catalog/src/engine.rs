//! Catalog sync engine.
//!
//! Every mutation is primary-store-commit-then-index-projection. The store
//! transaction commits strictly before any index operation is issued, so
//! the index is always eventually consistent and never ahead of the store.
//! Index failures never roll the store back; the engine decides per path
//! whether they surface (create paths) or degrade to a warning (missing
//! documents on update paths).
//!
//! Status changes go through [`CatalogEngine::change_status`], the single
//! place that knows how a [`StatusScope`] maps onto index operations.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use bazaar_core::{ProductId, ProductStatus, VariantId};

use crate::error::CatalogError;
use crate::models::{
    BulkResult, NewProduct, NewVariant, Product, ProductPatch, ResultPage, SearchCriteria,
    SortOption, validate_new_product, validate_new_variants, validate_product_patch,
    validate_search_criteria,
};
use crate::search::{
    BulkOperation, FieldUpdate, IndexFilter, IndexQuery, IndexSort, PRODUCT_INDEX, SearchIndex,
    VARIANT_INDEX, documents, variant_doc_id,
};
use crate::slug::{SUFFIX_LENGTH, random_suffix, slugify, slugify_with_suffix};
use crate::store::{CatalogStore, RepositoryError};

/// Bounded attempt budget for slug generation.
pub const MAX_SLUG_ATTEMPTS: u32 = 5;

/// Which search-index documents a status change must touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusScope {
    /// Only the product document.
    ProductOnly,
    /// One variant document, addressed by `variant_id`.
    VariantSingle,
    /// The product document plus every variant document of the product.
    ProductWithVariants,
    /// Every variant document of the product, by query.
    VariantsByProduct,
    /// Exactly the variant documents listed in `variant_ids`.
    VariantList,
}

/// A logical status change to propagate to the index.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub product_id: ProductId,
    pub status: ProductStatus,
    pub scope: StatusScope,
    /// Required for [`StatusScope::VariantSingle`].
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Used by [`StatusScope::VariantList`].
    #[serde(default)]
    pub variant_ids: Option<Vec<VariantId>>,
}

/// Orchestrates catalog mutations and their index projections.
pub struct CatalogEngine<S, I> {
    store: Arc<S>,
    index: Arc<I>,
}

impl<S, I> CatalogEngine<S, I>
where
    S: CatalogStore,
    I: SearchIndex,
{
    /// Create a new engine over its collaborators.
    pub const fn new(store: Arc<S>, index: Arc<I>) -> Self {
        Self { store, index }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a product with nested variants and tag links.
    ///
    /// Slug collisions retry the whole creation with a randomized suffix,
    /// up to [`MAX_SLUG_ATTEMPTS`] attempts. After the store commits, the
    /// product document and (if any) a bulk set of variant documents are
    /// projected; on this create path a projection failure surfaces to the
    /// caller, since a brand-new document must not silently fail to appear.
    ///
    /// # Errors
    ///
    /// `CatalogError::SlugGenerationExhausted` when the retry budget runs
    /// out; nothing was created in that case.
    #[tracing::instrument(skip(self, spec), fields(title = %spec.title))]
    pub async fn create_product(&self, spec: NewProduct) -> Result<Product, CatalogError> {
        validate_new_product(&spec)?;

        let mut attempt = 0;
        let product = loop {
            let slug = if attempt == 0 {
                slugify(&spec.title)
            } else {
                slugify_with_suffix(&spec.title, &random_suffix(SUFFIX_LENGTH))
            };

            match self.store.insert_product(&slug, &spec).await {
                Ok(product) => break product,
                Err(RepositoryError::Conflict(field)) if field == "slug" => {
                    attempt += 1;
                    if attempt >= MAX_SLUG_ATTEMPTS {
                        return Err(CatalogError::SlugGenerationExhausted);
                    }
                    tracing::debug!(attempt, "slug collision, retrying with randomized suffix");
                }
                Err(other) => return Err(other.into()),
            }
        };

        self.project_new_product(&product).await?;
        Ok(product)
    }

    /// Apply a partial update to a product and its referenced variants.
    ///
    /// After the store commits, the product and variant documents are
    /// partially updated by id; a missing document is logged and skipped
    /// (the index self-heals on the next full projection), any other index
    /// failure surfaces.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: ProductId,
        patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        validate_product_patch(&patch)?;

        let product = self.store.update_product(id, &patch).await.map_err(|e| {
            if matches!(e, RepositoryError::NotFound) {
                CatalogError::NotFound(format!("product {id} not found"))
            } else {
                e.into()
            }
        })?;

        self.partial_update_tolerant(
            PRODUCT_INDEX,
            &product.id.to_string(),
            documents::product_document(&product),
        )
        .await?;

        for variant in &product.variants {
            self.partial_update_tolerant(
                VARIANT_INDEX,
                &variant_doc_id(product.id, variant.id),
                documents::variant_document(&product, variant),
            )
            .await?;
        }

        Ok(product)
    }

    /// Insert variants for an existing product.
    ///
    /// The new variant documents are bulk-projected as brand-new documents;
    /// a projection failure surfaces.
    ///
    /// # Errors
    ///
    /// `CatalogError::NotFound` when the product does not exist.
    #[tracing::instrument(skip(self, specs), fields(count = specs.len()))]
    pub async fn create_variants(
        &self,
        product_id: ProductId,
        specs: Vec<NewVariant>,
    ) -> Result<BulkResult, CatalogError> {
        validate_new_variants(&specs)?;

        let (product, variants) =
            self.store
                .insert_variants(product_id, &specs)
                .await
                .map_err(|e| {
                    if matches!(e, RepositoryError::NotFound) {
                        CatalogError::NotFound(format!("product {product_id} not found"))
                    } else {
                        e.into()
                    }
                })?;

        let operations = variants
            .iter()
            .map(|variant| BulkOperation {
                id: variant_doc_id(product.id, variant.id),
                document: documents::variant_document(&product, variant),
            })
            .collect();
        self.index.bulk_upsert(VARIANT_INDEX, operations).await?;

        Ok(BulkResult {
            count: variants.len(),
            variants,
        })
    }

    /// Soft-delete at one of three mutually exclusive scopes.
    ///
    /// - `variant_ids` given and `all_del` false: exactly those variants.
    /// - `all_del` true: the product and all of its variants.
    /// - Otherwise: only the product row.
    ///
    /// All deletions are status flips plus a timestamp; rows are never
    /// physically removed. The matching index projection goes through
    /// [`Self::change_status`].
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(
        &self,
        id: ProductId,
        variant_ids: Option<Vec<VariantId>>,
        all_del: bool,
    ) -> Result<bool, CatalogError> {
        let now = Utc::now();

        let change = match variant_ids {
            Some(ids) if !ids.is_empty() && !all_del => {
                let touched = self.store.soft_delete_variants(id, &ids, now).await?;
                if touched == 0 {
                    return Err(CatalogError::NotFound(
                        "no matching variants to delete".to_owned(),
                    ));
                }
                StatusChange {
                    product_id: id,
                    status: ProductStatus::Deleted,
                    scope: StatusScope::VariantList,
                    variant_id: None,
                    variant_ids: Some(ids),
                }
            }
            _ => {
                self.store.soft_delete_product(id, all_del, now).await.map_err(|e| {
                    if matches!(e, RepositoryError::NotFound) {
                        CatalogError::NotFound(format!("product {id} not found"))
                    } else {
                        e.into()
                    }
                })?;
                StatusChange {
                    product_id: id,
                    status: ProductStatus::Deleted,
                    scope: if all_del {
                        StatusScope::ProductWithVariants
                    } else {
                        StatusScope::ProductOnly
                    },
                    variant_id: None,
                    variant_ids: None,
                }
            }
        };

        self.change_status(change).await?;
        Ok(true)
    }

    /// Map a logical status change onto index operations.
    ///
    /// This is the status-propagation scope map: callers never hand-assemble
    /// index operations.
    ///
    /// # Errors
    ///
    /// `CatalogError::InvalidRequest` for [`StatusScope::VariantSingle`]
    /// without a `variant_id`, which is a caller contract violation.
    #[tracing::instrument(skip(self), fields(product_id = %change.product_id, scope = ?change.scope))]
    pub async fn change_status(&self, change: StatusChange) -> Result<(), CatalogError> {
        let StatusChange {
            product_id,
            status,
            scope,
            variant_id,
            variant_ids,
        } = change;

        let status_fields = json!({ "status": status });

        if matches!(scope, StatusScope::ProductOnly | StatusScope::ProductWithVariants) {
            self.partial_update_tolerant(
                PRODUCT_INDEX,
                &product_id.to_string(),
                status_fields.clone(),
            )
            .await?;
        }

        match scope {
            StatusScope::VariantSingle => {
                let variant_id = variant_id.ok_or_else(|| {
                    CatalogError::InvalidRequest(
                        "variant_id is required for a single-variant status update".to_owned(),
                    )
                })?;
                self.partial_update_tolerant(
                    VARIANT_INDEX,
                    &variant_doc_id(product_id, variant_id),
                    status_fields,
                )
                .await?;
            }
            StatusScope::VariantList => {
                let ids: Vec<String> = variant_ids
                    .unwrap_or_default()
                    .into_iter()
                    .map(|variant_id| variant_doc_id(product_id, variant_id))
                    .collect();
                if !ids.is_empty() {
                    self.index
                        .update_by_query(
                            VARIANT_INDEX,
                            IndexFilter::Ids(ids),
                            FieldUpdate::status(status),
                        )
                        .await?;
                }
            }
            StatusScope::VariantsByProduct | StatusScope::ProductWithVariants => {
                self.index
                    .update_by_query(
                        VARIANT_INDEX,
                        IndexFilter::Term {
                            field: "productId".to_owned(),
                            value: json!(product_id.as_i32()),
                        },
                        FieldUpdate::status(status),
                    )
                    .await?;
            }
            StatusScope::ProductOnly => {}
        }

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Search the product index. Read-only; never touches the store.
    pub async fn search(&self, criteria: SearchCriteria) -> Result<ResultPage, CatalogError> {
        validate_search_criteria(&criteria)?;

        let mut filters = Vec::new();
        if let Some(category_id) = criteria.category_id {
            filters.push(IndexFilter::Term {
                field: "categoryId".to_owned(),
                value: json!(category_id.as_i32()),
            });
        }
        if !criteria.brand_ids.is_empty() {
            filters.push(IndexFilter::Terms {
                field: "brandId".to_owned(),
                values: criteria.brand_ids.iter().map(|id| json!(id.as_i32())).collect(),
            });
        }
        if criteria.in_stock {
            filters.push(IndexFilter::StockPositive);
        }
        if criteria.min_price.is_some() || criteria.max_price.is_some() {
            filters.push(IndexFilter::PriceRange {
                min: criteria.min_price,
                max: criteria.max_price,
            });
        }
        for (key, values) in &criteria.attributes {
            filters.push(IndexFilter::Attribute {
                key: key.clone(),
                values: values.clone(),
            });
        }

        let query = IndexQuery {
            text: criteria.query.clone().filter(|q| !q.trim().is_empty()),
            filters,
            sort: match criteria.sort {
                SortOption::Relevance => IndexSort::Relevance,
                SortOption::PriceAsc => IndexSort::PriceAsc,
                SortOption::PriceDesc => IndexSort::PriceDesc,
                SortOption::Newest => IndexSort::NewestFirst,
            },
            from: (criteria.page - 1) * criteria.limit,
            size: criteria.limit,
        };

        let result = self.index.search(PRODUCT_INDEX, &query).await?;

        Ok(ResultPage {
            total: result.total,
            pages: result.total.div_ceil(criteria.limit as u64),
            page: criteria.page,
            hits: result.hits,
        })
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// `CatalogError::NotFound` when the product does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("product {id} not found")))
    }

    /// Get a product by slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        self.store
            .get_product_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("product '{slug}' not found")))
    }

    /// Get a product with only its ACTIVE variants, newest first.
    ///
    /// A deleted product with no active variants left is reported as gone.
    pub async fn get_active_variants(&self, id: ProductId) -> Result<Product, CatalogError> {
        let product = self
            .store
            .get_product_with_active_variants(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("product {id} not found")))?;

        if product.status == ProductStatus::Deleted && product.variants.is_empty() {
            return Err(CatalogError::NotFound(
                "this product is no longer available".to_owned(),
            ));
        }

        Ok(product)
    }

    // =========================================================================
    // Projections
    // =========================================================================

    /// Project a freshly created product: full product document plus a bulk
    /// set of variant documents. The two writes have no ordering requirement
    /// between them and run concurrently.
    async fn project_new_product(&self, product: &Product) -> Result<(), CatalogError> {
        let product_doc_id = product.id.to_string();
        let product_write = self.index.upsert(
            PRODUCT_INDEX,
            &product_doc_id,
            documents::product_document(product),
        );

        if product.variants.is_empty() {
            product_write.await?;
            return Ok(());
        }

        let operations = product
            .variants
            .iter()
            .map(|variant| BulkOperation {
                id: variant_doc_id(product.id, variant.id),
                document: documents::variant_document(product, variant),
            })
            .collect();
        let variants_write = self.index.bulk_upsert(VARIANT_INDEX, operations);

        let (product_result, variants_result) = tokio::join!(product_write, variants_write);
        product_result?;
        variants_result?;
        Ok(())
    }

    /// Partially update one document, tolerating a missing document: the
    /// index will self-heal on the next full projection.
    async fn partial_update_tolerant(
        &self,
        index: &str,
        doc_id: &str,
        fields: serde_json::Value,
    ) -> Result<(), CatalogError> {
        match self.index.partial_update(index, doc_id, fields).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::warn!(index, doc_id, "document missing in search index, skipping update");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
