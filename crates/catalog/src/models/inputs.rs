//! Input shapes for catalog operations, with explicit validation functions.
//!
//! Shapes are plain structs; validation collects field-level violations
//! rather than failing on the first one.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bazaar_core::{
    BrandId, CategoryId, FieldViolation, ProductStatus, TagId, ValidationError, VariantId,
};

use super::product::{ProductImage, Variant};

/// Maximum fraction digits for monetary values.
const PRICE_MAX_SCALE: u32 = 2;

/// Input for creating a product with nested variants and tag links.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
}

/// Input for creating one variant.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
    pub sku: String,
    /// Price override; `None` falls back to the parent product price.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// Partial update for a product.
///
/// `None` fields are untouched. `tag_ids` replaces the tag associations
/// wholesale when present. Referenced variants are patched by id; variant
/// ids that do not belong to the product are silently skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub images: Option<Vec<ProductImage>>,
    #[serde(default)]
    pub tag_ids: Option<Vec<TagId>>,
    #[serde(default)]
    pub variants: Vec<VariantPatch>,
}

/// Partial update for one variant, matched by id.
///
/// Status is re-derived from `stock` when `stock` changes and no explicit
/// `status` is supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantPatch {
    pub id: VariantId,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<i32>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub attributes: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// Result of a bulk variant insert.
#[derive(Debug, Clone, Serialize)]
pub struct BulkResult {
    pub count: usize,
    pub variants: Vec<Variant>,
}

/// Search request against the product index.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchCriteria {
    /// Free-text query across title/description/sku/brand/category.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub brand_ids: Vec<BrandId>,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    /// Per-attribute value filters: each entry requires a key match and a
    /// value-in-set match on the nested attribute documents.
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub sort: SortOption,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            query: None,
            category_id: None,
            brand_ids: Vec::new(),
            min_price: None,
            max_price: None,
            attributes: BTreeMap::new(),
            in_stock: false,
            page: default_page(),
            limit: default_limit(),
            sort: SortOption::default(),
        }
    }
}

const fn default_page() -> usize {
    1
}

const fn default_limit() -> usize {
    20
}

/// Fixed sort enumeration for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Score-descending (default).
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
}

/// One page of raw projected documents from the search index.
#[derive(Debug, Clone, Serialize)]
pub struct ResultPage {
    pub hits: Vec<Value>,
    pub total: u64,
    pub page: usize,
    /// `ceil(total / limit)`.
    pub pages: u64,
}

// =============================================================================
// Validation
// =============================================================================

/// Validate a product creation payload.
///
/// # Errors
///
/// Returns every violation at once.
pub fn validate_new_product(spec: &NewProduct) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if !spec.title.chars().any(char::is_alphanumeric) {
        violations.push(FieldViolation::new(
            "title",
            "must contain at least one letter or digit",
        ));
    }

    check_price("price", spec.price, &mut violations);

    if spec.stock < 0 {
        violations.push(FieldViolation::new("stock", "cannot be negative"));
    }

    let main_count = spec.images.iter().filter(|img| img.is_main).count();
    if main_count > 1 {
        violations.push(FieldViolation::new(
            "images",
            "at most one image can be flagged as main",
        ));
    }

    for variant in &spec.variants {
        collect_variant_violations(variant, &mut violations);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

/// Validate a bulk variant creation payload.
///
/// # Errors
///
/// Returns a violation for an empty list and for each malformed variant.
pub fn validate_new_variants(specs: &[NewVariant]) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if specs.is_empty() {
        violations.push(FieldViolation::new("variants", "cannot be empty"));
    }

    for spec in specs {
        collect_variant_violations(spec, &mut violations);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

/// Validate a product patch.
///
/// # Errors
///
/// Returns every violation at once.
pub fn validate_product_patch(patch: &ProductPatch) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if let Some(title) = &patch.title
        && !title.chars().any(char::is_alphanumeric)
    {
        violations.push(FieldViolation::new(
            "title",
            "must contain at least one letter or digit",
        ));
    }

    if let Some(price) = patch.price {
        check_price("price", price, &mut violations);
    }

    if let Some(stock) = patch.stock
        && stock < 0
    {
        violations.push(FieldViolation::new("stock", "cannot be negative"));
    }

    for variant in &patch.variants {
        if let Some(price) = variant.price {
            check_price("variants.price", price, &mut violations);
        }
        if let Some(stock) = variant.stock
            && stock < 0
        {
            violations.push(FieldViolation::new("variants.stock", "cannot be negative"));
        }
        if let Some(sku) = &variant.sku
            && sku.trim().is_empty()
        {
            violations.push(FieldViolation::new("variants.sku", "cannot be empty"));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

/// Validate search criteria.
///
/// # Errors
///
/// Returns violations for out-of-range paging or negative price bounds.
pub fn validate_search_criteria(criteria: &SearchCriteria) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if criteria.page == 0 {
        violations.push(FieldViolation::new("page", "must be at least 1"));
    }
    if criteria.limit == 0 {
        violations.push(FieldViolation::new("limit", "must be at least 1"));
    }
    if let Some(min) = criteria.min_price
        && min < Decimal::ZERO
    {
        violations.push(FieldViolation::new("min_price", "cannot be negative"));
    }
    if let Some(max) = criteria.max_price
        && max < Decimal::ZERO
    {
        violations.push(FieldViolation::new("max_price", "cannot be negative"));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

fn collect_variant_violations(spec: &NewVariant, violations: &mut Vec<FieldViolation>) {
    if spec.sku.trim().is_empty() {
        violations.push(FieldViolation::new("variants.sku", "cannot be empty"));
    }
    if let Some(price) = spec.price {
        check_price("variants.price", price, violations);
    }
    if spec.stock < 0 {
        violations.push(FieldViolation::new("variants.stock", "cannot be negative"));
    }
}

fn check_price(field: &'static str, price: Decimal, violations: &mut Vec<FieldViolation>) {
    if price < Decimal::ZERO {
        violations.push(FieldViolation::new(field, "cannot be negative"));
    }
    if price.scale() > PRICE_MAX_SCALE {
        violations.push(FieldViolation::new(
            field,
            format!("at most {PRICE_MAX_SCALE} fraction digits"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_product() -> NewProduct {
        NewProduct {
            title: "Running Shoe".to_owned(),
            description: "Light trail runner".to_owned(),
            price: Decimal::new(12999, 2),
            stock: 5,
            sku: None,
            images: Vec::new(),
            brand_id: None,
            category_id: None,
            tag_ids: Vec::new(),
            variants: Vec::new(),
        }
    }

    #[test]
    fn test_valid_product_passes() {
        assert!(validate_new_product(&valid_product()).is_ok());
    }

    #[test]
    fn test_price_scale_rejected() {
        let mut spec = valid_product();
        spec.price = Decimal::new(129_999, 3); // 129.999
        let err = validate_new_product(&spec).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations.first().unwrap().field, "price");
    }

    #[test]
    fn test_symbol_only_title_rejected() {
        let mut spec = valid_product();
        spec.title = "!!!".to_owned();
        assert!(validate_new_product(&spec).is_err());
    }

    #[test]
    fn test_two_main_images_rejected() {
        let mut spec = valid_product();
        spec.images = vec![
            ProductImage {
                url: "a.jpg".to_owned(),
                is_main: true,
            },
            ProductImage {
                url: "b.jpg".to_owned(),
                is_main: true,
            },
        ];
        assert!(validate_new_product(&spec).is_err());
    }

    #[test]
    fn test_empty_variant_sku_rejected() {
        let specs = vec![NewVariant {
            sku: "  ".to_owned(),
            price: None,
            stock: 1,
            attributes: BTreeMap::new(),
            barcode: None,
        }];
        assert!(validate_new_variants(&specs).is_err());
    }

    #[test]
    fn test_empty_variant_list_rejected() {
        assert!(validate_new_variants(&[]).is_err());
    }

    #[test]
    fn test_search_paging_validated() {
        let criteria = SearchCriteria {
            page: 0,
            ..SearchCriteria::default()
        };
        assert!(validate_search_criteria(&criteria).is_err());
        assert!(validate_search_criteria(&SearchCriteria::default()).is_ok());
    }
}
