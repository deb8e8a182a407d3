//! Document projections for the search index.
//!
//! Index documents are flattened, denormalized views of catalog rows:
//! derived state, re-derivable from the primary store at any time. Monetary
//! values convert to the index's numeric representation here and nowhere
//! else.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value, json};

use crate::models::{Product, Variant};
use crate::slug::slugify;

/// Leading numeric prefix of a string attribute value, e.g. `42` in
/// `"42mm"`. Search filters depend on this classification; it is documented
/// behavior, not an implementation accident.
static NUMERIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // the pattern is a literal
    Regex::new(r"^(\d+(\.\d+)?)").unwrap()
});

/// Full product document for the product index.
#[must_use]
pub fn product_document(product: &Product) -> Value {
    let mut doc = Map::new();
    doc.insert("id".to_owned(), json!(product.id.as_i32()));
    doc.insert("title".to_owned(), json!(product.title));
    doc.insert("description".to_owned(), json!(product.description));
    doc.insert("slug".to_owned(), json!(product.slug));
    doc.insert("price".to_owned(), json!(price_number(product.price)));
    doc.insert("stock".to_owned(), json!(product.stock));
    if let Some(sku) = &product.sku {
        doc.insert("sku".to_owned(), json!(sku));
    }

    if let Some(brand) = &product.brand {
        doc.insert("brandId".to_owned(), json!(brand.id.as_i32()));
    }
    doc.insert(
        "brandName".to_owned(),
        json!(product.brand.as_ref().map_or("", |b| b.name.as_str())),
    );
    if let Some(category) = &product.category {
        doc.insert("categoryId".to_owned(), json!(category.id.as_i32()));
    }
    doc.insert(
        "categoryName".to_owned(),
        json!(product.category.as_ref().map_or("", |c| c.name.as_str())),
    );

    let tags: Vec<Value> = product
        .tags
        .iter()
        .map(|tag| {
            json!({
                "id": tag.id.as_i32(),
                "name": tag.name,
                "slug": slugify(&tag.name),
            })
        })
        .collect();
    doc.insert("tags".to_owned(), Value::Array(tags));

    doc.insert(
        "mainImage".to_owned(),
        json!(product.main_image().unwrap_or("")),
    );
    let images: Vec<Value> = product.images.iter().map(|img| json!(img.url)).collect();
    doc.insert("images".to_owned(), Value::Array(images));

    doc.insert("status".to_owned(), json!(product.status));
    doc.insert("createdAt".to_owned(), json!(product.created_at.to_rfc3339()));

    Value::Object(doc)
}

/// Variant document for the variants index.
///
/// Carries denormalized parent fields so variant hits render without a
/// second lookup.
#[must_use]
pub fn variant_document(product: &Product, variant: &Variant) -> Value {
    let title = if variant.sku.is_empty() {
        product.title.clone()
    } else {
        format!("{} - {}", product.title, variant.sku)
    };

    json!({
        "id": format!("{}-{}", product.id, variant.id),
        "productId": product.id.as_i32(),
        "variantId": variant.id.as_i32(),
        "title": title,
        "slug": product.slug,
        "price": price_number(variant.effective_price(product.price)),
        "stock": variant.stock,
        "sku": variant.sku,
        "brandName": product.brand.as_ref().map_or("", |b| b.name.as_str()),
        "categoryName": product.category.as_ref().map_or("", |c| c.name.as_str()),
        "image": product.main_image().unwrap_or(""),
        "status": variant.status,
        "attributes": index_attributes(&variant.attributes),
    })
}

/// Flatten an attribute bag into nested index entries.
///
/// Each entry carries the stringified value plus `numValue` when the value
/// is numeric or starts with a numeric prefix.
#[must_use]
pub fn index_attributes(attributes: &BTreeMap<String, Value>) -> Vec<Value> {
    attributes
        .iter()
        .map(|(key, raw)| {
            let value = attribute_string(raw);
            let mut entry = Map::new();
            entry.insert("key".to_owned(), json!(key));
            entry.insert("value".to_owned(), json!(value));
            if let Some(num) = numeric_value(raw) {
                entry.insert("numValue".to_owned(), json!(num));
            }
            Value::Object(entry)
        })
        .collect()
}

/// Stringify an attribute value the way the index stores it.
fn attribute_string(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric classification of an attribute value.
fn numeric_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => NUMERIC_PREFIX
            .captures(s)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        _ => None,
    }
}

/// Convert a price to the index's numeric representation.
///
/// This is the only place decimal prices become floats; the engine itself
/// never does float arithmetic on money.
pub(crate) fn price_number(price: Decimal) -> f64 {
    price.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::{ProductId, ProductStatus, VariantId};
    use chrono::Utc;

    fn product() -> Product {
        Product {
            id: ProductId::new(101),
            title: "Trail Shoe".to_owned(),
            slug: "trail-shoe".to_owned(),
            description: "Grippy".to_owned(),
            price: Decimal::new(12999, 2),
            stock: 4,
            sku: None,
            status: ProductStatus::Active,
            images: Vec::new(),
            brand: None,
            category: None,
            tags: Vec::new(),
            variants: Vec::new(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn variant(attributes: BTreeMap<String, Value>) -> Variant {
        Variant {
            id: VariantId::new(2),
            product_id: ProductId::new(101),
            sku: "TS-42".to_owned(),
            price: None,
            stock: 4,
            status: ProductStatus::Active,
            attributes,
            barcode: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_variant_document_composite_id() {
        let doc = variant_document(&product(), &variant(BTreeMap::new()));
        assert_eq!(doc["id"], json!("101-2"));
        assert_eq!(doc["productId"], json!(101));
        assert_eq!(doc["variantId"], json!(2));
        assert_eq!(doc["title"], json!("Trail Shoe - TS-42"));
    }

    #[test]
    fn test_variant_price_falls_back_to_parent() {
        let doc = variant_document(&product(), &variant(BTreeMap::new()));
        assert_eq!(doc["price"], json!(129.99));
    }

    #[test]
    fn test_numeric_prefix_heuristic() {
        let mut attrs = BTreeMap::new();
        attrs.insert("size".to_owned(), json!("42mm"));
        attrs.insert("fit".to_owned(), json!("XL"));
        attrs.insert("weight".to_owned(), json!(10.5));

        let entries = index_attributes(&attrs);

        let size = entries.iter().find(|e| e["key"] == json!("size")).unwrap();
        assert_eq!(size["value"], json!("42mm"));
        assert_eq!(size["numValue"], json!(42.0));

        let fit = entries.iter().find(|e| e["key"] == json!("fit")).unwrap();
        assert_eq!(fit["value"], json!("XL"));
        assert!(fit.get("numValue").is_none());

        let weight = entries.iter().find(|e| e["key"] == json!("weight")).unwrap();
        assert_eq!(weight["numValue"], json!(10.5));
    }

    #[test]
    fn test_decimal_string_prefix() {
        let mut attrs = BTreeMap::new();
        attrs.insert("length".to_owned(), json!("1.5 m"));
        let entries = index_attributes(&attrs);
        assert_eq!(entries.first().unwrap()["numValue"], json!(1.5));
    }

    #[test]
    fn test_product_document_empty_relation_names() {
        let doc = product_document(&product());
        assert_eq!(doc["brandName"], json!(""));
        assert_eq!(doc["categoryName"], json!(""));
        assert_eq!(doc["status"], json!("ACTIVE"));
        assert!(doc.get("sku").is_none());
        assert!(doc.get("brandId").is_none());
    }
}
