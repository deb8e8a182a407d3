//! Product and variant domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use bazaar_core::{BrandId, CategoryId, ProductId, ProductStatus, TagId, VariantId};

/// A catalog product with its denormalized relations.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    /// Store-assigned unique ID.
    pub id: ProductId,
    pub title: String,
    /// Unique, URL-safe slug.
    pub slug: String,
    pub description: String,
    /// Price in the store currency, at most 2 fraction digits.
    pub price: Decimal,
    pub stock: i32,
    pub sku: Option<String>,
    pub status: ProductStatus,
    /// Ordered image list; at most one flagged as main.
    pub images: Vec<ProductImage>,
    pub brand: Option<BrandRef>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
    /// Set on soft deletion; the row is never physically removed.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    /// URL of the main image, falling back to the first image.
    #[must_use]
    pub fn main_image(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|img| img.is_main)
            .or_else(|| self.images.first())
            .map(|img| img.url.as_str())
    }
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    /// Price override; `None` falls back to the parent product price.
    pub price: Option<Decimal>,
    pub stock: i32,
    pub status: ProductStatus,
    /// Untyped key/value attribute bag (color, size, ...).
    pub attributes: BTreeMap<String, Value>,
    pub barcode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Variant {
    /// The price this variant sells at, given its parent's price.
    #[must_use]
    pub fn effective_price(&self, parent_price: Decimal) -> Decimal {
        self.price.unwrap_or(parent_price)
    }
}

/// A product image.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct ProductImage {
    pub url: String,
    /// Exactly one image per product should carry this flag.
    #[serde(default)]
    pub is_main: bool,
}

/// Denormalized brand reference.
#[derive(Debug, Clone, Serialize)]
pub struct BrandRef {
    pub id: BrandId,
    pub name: String,
}

/// Denormalized category reference.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
}

/// Denormalized tag reference.
#[derive(Debug, Clone, Serialize)]
pub struct TagRef {
    pub id: TagId,
    pub name: String,
}

/// Variant status derived from stock.
///
/// Applied at creation and bulk insert, and re-applied on stock updates
/// unless the update carries an explicit status.
#[must_use]
pub const fn derived_status(stock: i32) -> ProductStatus {
    if stock == 0 {
        ProductStatus::Inactive
    } else {
        ProductStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_status() {
        assert_eq!(derived_status(0), ProductStatus::Inactive);
        assert_eq!(derived_status(10), ProductStatus::Active);
    }

    #[test]
    fn test_main_image_prefers_flag() {
        let product = product_with_images(vec![
            ProductImage {
                url: "first.jpg".to_owned(),
                is_main: false,
            },
            ProductImage {
                url: "hero.jpg".to_owned(),
                is_main: true,
            },
        ]);
        assert_eq!(product.main_image(), Some("hero.jpg"));
    }

    #[test]
    fn test_main_image_falls_back_to_first() {
        let product = product_with_images(vec![ProductImage {
            url: "first.jpg".to_owned(),
            is_main: false,
        }]);
        assert_eq!(product.main_image(), Some("first.jpg"));
    }

    #[test]
    fn test_effective_price_falls_back_to_parent() {
        let variant = Variant {
            id: VariantId::new(1),
            product_id: ProductId::new(1),
            sku: "SKU-1".to_owned(),
            price: None,
            stock: 3,
            status: ProductStatus::Active,
            attributes: BTreeMap::new(),
            barcode: None,
            created_at: Utc::now(),
            deleted_at: None,
        };
        assert_eq!(
            variant.effective_price(Decimal::new(1999, 2)),
            Decimal::new(1999, 2)
        );
    }

    fn product_with_images(images: Vec<ProductImage>) -> Product {
        Product {
            id: ProductId::new(1),
            title: "Test".to_owned(),
            slug: "test".to_owned(),
            description: String::new(),
            price: Decimal::ZERO,
            stock: 0,
            sku: None,
            status: ProductStatus::Active,
            images,
            brand: None,
            category: None,
            tags: Vec::new(),
            variants: Vec::new(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}
