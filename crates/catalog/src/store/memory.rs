//! In-memory catalog store for tests.
//!
//! Reproduces the Postgres store's observable behavior: slug uniqueness,
//! stock-derived variant status, wholesale tag replacement, silent skip of
//! unknown variant ids, and soft-delete scopes.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{BrandId, CategoryId, ProductId, ProductStatus, TagId, VariantId};

use super::{CatalogStore, RepositoryError};
use crate::models::{
    BrandRef, CategoryRef, NewProduct, NewVariant, Product, ProductPatch, TagRef, Variant,
    derived_status,
};

#[derive(Debug, Default)]
struct Inner {
    products: BTreeMap<i32, Product>,
    brands: BTreeMap<i32, String>,
    categories: BTreeMap<i32, String>,
    tags: BTreeMap<i32, String>,
    next_product_id: i32,
    next_variant_id: i32,
    next_ref_id: i32,
}

/// In-memory catalog store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryCatalogStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a brand and return its id.
    pub fn register_brand(&self, name: &str) -> BrandId {
        self.lock_mut(|inner| {
            inner.next_ref_id += 1;
            inner.brands.insert(inner.next_ref_id, name.to_owned());
            BrandId::new(inner.next_ref_id)
        })
    }

    /// Register a category and return its id.
    pub fn register_category(&self, name: &str) -> CategoryId {
        self.lock_mut(|inner| {
            inner.next_ref_id += 1;
            inner.categories.insert(inner.next_ref_id, name.to_owned());
            CategoryId::new(inner.next_ref_id)
        })
    }

    /// Register a tag and return its id.
    pub fn register_tag(&self, name: &str) -> TagId {
        self.lock_mut(|inner| {
            inner.next_ref_id += 1;
            inner.tags.insert(inner.next_ref_id, name.to_owned());
            TagId::new(inner.next_ref_id)
        })
    }

    /// Number of stored products.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.lock(|inner| inner.products.len())
    }

    /// Raw stored product, including soft-deleted rows.
    #[must_use]
    pub fn stored(&self, id: ProductId) -> Option<Product> {
        self.lock(|inner| inner.products.get(&id.as_i32()).cloned())
    }

    fn lock<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let guard = self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }

    fn lock_mut<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

impl Inner {
    fn resolve_brand(&self, id: Option<BrandId>) -> Result<Option<BrandRef>, RepositoryError> {
        id.map(|id| {
            self.brands
                .get(&id.as_i32())
                .map(|name| BrandRef {
                    id,
                    name: name.clone(),
                })
                .ok_or(RepositoryError::NotFound)
        })
        .transpose()
    }

    fn resolve_category(
        &self,
        id: Option<CategoryId>,
    ) -> Result<Option<CategoryRef>, RepositoryError> {
        id.map(|id| {
            self.categories
                .get(&id.as_i32())
                .map(|name| CategoryRef {
                    id,
                    name: name.clone(),
                })
                .ok_or(RepositoryError::NotFound)
        })
        .transpose()
    }

    fn resolve_tags(&self, ids: &[TagId]) -> Result<Vec<TagRef>, RepositoryError> {
        ids.iter()
            .map(|id| {
                self.tags
                    .get(&id.as_i32())
                    .map(|name| TagRef {
                        id: *id,
                        name: name.clone(),
                    })
                    .ok_or(RepositoryError::NotFound)
            })
            .collect()
    }

    fn build_variant(&mut self, product_id: ProductId, spec: &NewVariant) -> Variant {
        self.next_variant_id += 1;
        Variant {
            id: VariantId::new(self.next_variant_id),
            product_id,
            sku: spec.sku.clone(),
            price: spec.price,
            stock: spec.stock,
            status: derived_status(spec.stock),
            attributes: spec.attributes.clone(),
            barcode: spec.barcode.clone(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_product(
        &self,
        slug: &str,
        spec: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        self.lock_mut(|inner| {
            if inner.products.values().any(|p| p.slug == slug) {
                return Err(RepositoryError::Conflict("slug".to_owned()));
            }

            let brand = inner.resolve_brand(spec.brand_id)?;
            let category = inner.resolve_category(spec.category_id)?;
            let tags = inner.resolve_tags(&spec.tag_ids)?;

            inner.next_product_id += 1;
            let id = ProductId::new(inner.next_product_id);

            let variants = spec
                .variants
                .iter()
                .map(|v| inner.build_variant(id, v))
                .collect();

            let product = Product {
                id,
                title: spec.title.clone(),
                slug: slug.to_owned(),
                description: spec.description.clone(),
                price: spec.price,
                stock: spec.stock,
                sku: spec.sku.clone(),
                status: ProductStatus::Active,
                images: spec.images.clone(),
                brand,
                category,
                tags,
                variants,
                created_at: Utc::now(),
                deleted_at: None,
            };
            inner.products.insert(id.as_i32(), product.clone());
            Ok(product)
        })
    }

    async fn update_product(
        &self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<Product, RepositoryError> {
        self.lock_mut(|inner| {
            let tags = patch
                .tag_ids
                .as_ref()
                .map(|ids| inner.resolve_tags(ids))
                .transpose()?;

            let product = inner
                .products
                .get_mut(&id.as_i32())
                .ok_or(RepositoryError::NotFound)?;

            if let Some(title) = &patch.title {
                product.title.clone_from(title);
            }
            if let Some(description) = &patch.description {
                product.description.clone_from(description);
            }
            if let Some(price) = patch.price {
                product.price = price;
            }
            if let Some(stock) = patch.stock {
                product.stock = stock;
            }
            if let Some(status) = patch.status {
                product.status = status;
            }
            if let Some(images) = &patch.images {
                product.images.clone_from(images);
            }
            if let Some(tags) = tags {
                product.tags = tags;
            }

            for variant_patch in &patch.variants {
                // Ids not on this product are silently skipped.
                let Some(variant) = product
                    .variants
                    .iter_mut()
                    .find(|v| v.id == variant_patch.id)
                else {
                    continue;
                };

                if let Some(sku) = &variant_patch.sku {
                    variant.sku.clone_from(sku);
                }
                if let Some(price) = variant_patch.price {
                    variant.price = Some(price);
                }
                if let Some(stock) = variant_patch.stock {
                    variant.stock = stock;
                }
                if let Some(attributes) = &variant_patch.attributes {
                    variant.attributes.clone_from(attributes);
                }
                if let Some(barcode) = &variant_patch.barcode {
                    variant.barcode = Some(barcode.clone());
                }
                // Explicit status wins; otherwise a stock change re-derives it.
                if let Some(status) = variant_patch.status {
                    variant.status = status;
                } else if let Some(stock) = variant_patch.stock {
                    variant.status = derived_status(stock);
                }
            }

            Ok(product.clone())
        })
    }

    async fn insert_variants(
        &self,
        product_id: ProductId,
        specs: &[NewVariant],
    ) -> Result<(Product, Vec<Variant>), RepositoryError> {
        self.lock_mut(|inner| {
            if !inner.products.contains_key(&product_id.as_i32()) {
                return Err(RepositoryError::NotFound);
            }

            let new_variants: Vec<Variant> = specs
                .iter()
                .map(|spec| inner.build_variant(product_id, spec))
                .collect();

            let product = inner
                .products
                .get_mut(&product_id.as_i32())
                .ok_or(RepositoryError::NotFound)?;
            product.variants.extend(new_variants.iter().cloned());

            Ok((product.clone(), new_variants))
        })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.lock(|inner| inner.products.get(&id.as_i32()).cloned()))
    }

    async fn get_product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(self.lock(|inner| inner.products.values().find(|p| p.slug == slug).cloned()))
    }

    async fn get_product_with_active_variants(
        &self,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        Ok(self.lock(|inner| {
            inner.products.get(&id.as_i32()).map(|product| {
                let mut product = product.clone();
                product
                    .variants
                    .retain(|v| v.status == ProductStatus::Active);
                product
                    .variants
                    .sort_by(|a, b| b.created_at.cmp(&a.created_at));
                product
            })
        }))
    }

    async fn soft_delete_product(
        &self,
        id: ProductId,
        cascade: bool,
        deleted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.lock_mut(|inner| {
            let product = inner
                .products
                .get_mut(&id.as_i32())
                .ok_or(RepositoryError::NotFound)?;

            product.status = ProductStatus::Deleted;
            product.deleted_at = Some(deleted_at);

            if cascade {
                for variant in &mut product.variants {
                    variant.status = ProductStatus::Deleted;
                    variant.deleted_at = Some(deleted_at);
                }
            }
            Ok(())
        })
    }

    async fn soft_delete_variants(
        &self,
        product_id: ProductId,
        variant_ids: &[VariantId],
        deleted_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        self.lock_mut(|inner| {
            let Some(product) = inner.products.get_mut(&product_id.as_i32()) else {
                return Ok(0);
            };

            let mut touched = 0;
            for variant in &mut product.variants {
                if variant_ids.contains(&variant.id) {
                    variant.status = ProductStatus::Deleted;
                    variant.deleted_at = Some(deleted_at);
                    touched += 1;
                }
            }
            Ok(touched)
        })
    }
}
