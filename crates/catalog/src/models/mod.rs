//! Catalog domain types.
//!
//! These types represent validated domain objects separate from database row
//! types. Input shapes live in [`inputs`] together with their explicit
//! validation functions.

pub mod inputs;
pub mod product;

pub use inputs::{
    BulkResult, NewProduct, NewVariant, ProductPatch, ResultPage, SearchCriteria, SortOption,
    VariantPatch, validate_new_product, validate_new_variants, validate_product_patch,
    validate_search_criteria,
};
pub use product::{BrandRef, CategoryRef, Product, ProductImage, TagRef, Variant, derived_status};
